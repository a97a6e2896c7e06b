use std::rc::Rc;

use crate::{errors::{self, source_location, SourceLocation}, lexer::{Token, TokenKind}, FoxError};

use super::{Case, Expr, ExprId, FunDecl, Literal, Pattern};

/// A cursor over the scanned tokens which allows bounded lookahead.
#[derive(Debug)]
pub struct TokenStream {
    tokens: Vec<Token>,
    current: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.current + n)
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().map(|t| t.is(kind)).unwrap_or_default()
    }

    pub fn check_nth(&self, n: usize, kind: TokenKind) -> bool {
        self.peek_nth(n).map(|t| t.is(kind)).unwrap_or_default()
    }

    /// Consumes the next token if it is one of the given kinds.
    pub fn take_one_of(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        if self.peek().map(|t| t.is_one_of(kinds)).unwrap_or_default() {
            self.next()
        } else {
            None
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn end_location(&self) -> SourceLocation {
        match self.tokens.last() {
            Some(last) => source_location("end of input".to_string(), last.line(), last.column() + last.lexeme().len()),
            None => source_location("end of input".to_string(), 1, 1),
        }
    }
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }
}

pub struct Parser;

// Macros which make it easier to implement certain common parts of the parser.
macro_rules! rd_term {
    ($name:ident := $token_id:ident => $ret:ty : $body:expr) => {
        fn $name($token_id: &mut TokenStream) -> Result<$ret, FoxError> {
            $body
        }
    };

    ($name:ident := $left:ident ( $($token:ident)|+ $right:ident )* => $node:ident) => {
        fn $name(tokens: &mut TokenStream) -> Result<Expr, FoxError> {
            let mut left = Self::$left(tokens)?;

            while let Some(op) = rd_matches!(tokens, $($token)|+) {
                let right = Self::$right(tokens)?;
                left = Expr::$node(Box::new(left), op, Box::new(right));
            }

            Ok(left)
        }
    };
}

macro_rules! rd_matches {
    ($tokens:ident, $($token:ident)|+) => {
        $tokens.take_one_of(&[$(TokenKind::$token),+])
    };
}

macro_rules! rd_consume {
    ($tokens:ident, $id:ident @ $token:ident => $ok:expr, $msg:expr, $advice:expr) => {
        match $tokens.take_one_of(&[TokenKind::$token]) {
            Some($id) => $ok,
            None => return Err(match $tokens.peek() {
                Some(unexpected) => errors::syntax(
                    unexpected,
                    format!("{}, but got '{}' instead.", $msg, unexpected.lexeme()),
                    $advice
                ),
                None => errors::syntax_at(
                    $tokens.end_location(),
                    format!("{}, but reached the end of the file instead.", $msg),
                    $advice
                ),
            }),
        }
    };

    ($tokens:ident, $token:ident => $ok:expr, $msg:expr, $advice:expr) => {
        rd_consume!($tokens, _token @ $token => $ok, $msg, $advice)
    };

    ($tokens:ident, $token:ident, $msg:expr, $advice:expr) => {
        rd_consume!($tokens, $token => {}, $msg, $advice)
    };
}

impl Parser {
    /// Parses every top-level expression in the token stream.
    ///
    /// A syntax error abandons only the expression being parsed: the offending
    /// token is skipped and parsing resumes with the next top-level expression.
    pub fn parse(tokens: Vec<Token>) -> (Vec<Expr>, Vec<FoxError>) {
        let mut tokens = TokenStream::new(tokens);
        let mut exprs = Vec::new();
        let mut errs = Vec::new();

        while !tokens.is_at_end() {
            let start = tokens.current;
            match Self::expression(&mut tokens) {
                Ok(expr) => exprs.push(expr),
                Err(err) => {
                    errs.push(err);
                    if tokens.current == start {
                        tokens.next();
                    }
                },
            }
        }

        (exprs, errs)
    }

    rd_term!(expression := tokens => Expr : crate::grow_stack(|| {
        match tokens.peek().map(|t| t.kind()) {
            Some(TokenKind::Defun) if tokens.check_nth(2, TokenKind::Identifier) => {
                tokens.next();
                Self::named_function(tokens)
            },
            Some(TokenKind::Var) => {
                tokens.next();
                Self::var_def(tokens)
            },
            Some(TokenKind::Assign) => {
                tokens.next();
                Self::assignment(tokens)
            },
            Some(TokenKind::Import) => {
                tokens.next();
                Self::import(tokens)
            },
            Some(TokenKind::While) => {
                rd_consume!(tokens, keyword @ While => Self::while_loop(tokens, keyword), "Expected 'while'", "")
            },
            Some(TokenKind::Match) => {
                rd_consume!(tokens, keyword @ Match => Self::match_expr(tokens, keyword), "Expected 'match'", "")
            },
            Some(TokenKind::Break) => {
                rd_consume!(tokens, keyword @ Break => Ok(Expr::Break(keyword)), "Expected 'break'", "")
            },
            _ => Self::ternary(tokens),
        }
    }));

    rd_term!(var_def := tokens => Expr : {
        rd_consume!(tokens, LeftParen, "Expected '(' after 'var'", "Declare variables like `var(name, value)`.");

        rd_consume!(tokens, name @ Identifier => {
            let init = if rd_matches!(tokens, Comma).is_some() {
                Some(Box::new(Self::body(tokens)?))
            } else {
                None
            };

            rd_consume!(
                tokens,
                RightParen => Ok(Expr::VarDef(name, init)),
                "Expected ')' after the arguments of 'var'",
                "Make sure that you close the variable declaration with a ')'.")
            },
            "Expected an identifier as the first argument to 'var'",
            "Provide a variable name as the first argument, like `var(name, value)`.")
    });

    rd_term!(assignment := tokens => Expr : {
        rd_consume!(tokens, LeftParen, "Expected '(' after 'assign'", "Assign to variables like `assign(name, value)`.");

        rd_consume!(tokens, name @ Identifier => {
            let index = if rd_matches!(tokens, LeftBracket).is_some() {
                let index = Self::expression(tokens)?;
                rd_consume!(tokens, RightBracket, "Expected ']' after the element index", "Close the element index with a ']'.");
                Some(Box::new(index))
            } else {
                None
            };

            rd_consume!(tokens, Comma, "Expected ',' after the assignment target", "Separate the target and the new value with a ','.");
            let value = Self::body(tokens)?;

            rd_consume!(
                tokens,
                RightParen => Ok(Expr::Assign(ExprId::fresh(), name, index, Box::new(value))),
                "Expected ')' after the arguments of 'assign'",
                "Make sure that you close the assignment with a ')'.")
            },
            "Expected an identifier as the first argument to 'assign'",
            "Provide the name of the variable to assign to, like `assign(name, value)`.")
    });

    rd_term!(import := tokens => Expr : {
        rd_consume!(tokens, LeftParen, "Expected '(' after 'import'", "Import files like `import(\"path/to/file.fox\")`.");
        rd_consume!(tokens, file @ String => {
            rd_consume!(tokens, RightParen => Ok(Expr::Import(file)), "Expected ')' after the imported path", "Make sure that you close the import with a ')'.")
        }, "Expected a string naming the file to import", "Provide the imported path as a string literal.")
    });

    fn while_loop(tokens: &mut TokenStream, keyword: Token) -> Result<Expr, FoxError> {
        rd_consume!(tokens, LeftParen, "Expected '(' after 'while'", "Write loops like `while(condition, body)` or `while(body)`.");

        let first = Self::body(tokens)?;
        let (cond, body) = if rd_matches!(tokens, Comma).is_some() {
            (Some(Box::new(first)), Self::body(tokens)?)
        } else {
            (None, first)
        };

        rd_consume!(
            tokens,
            RightParen => Ok(Expr::While(keyword, cond, Box::new(body))),
            "Expected ')' after the arguments of 'while'",
            "Make sure that you close the loop with a ')'.")
    }

    fn match_expr(tokens: &mut TokenStream, keyword: Token) -> Result<Expr, FoxError> {
        let scrutinee = Self::ternary(tokens)?;
        rd_consume!(tokens, LeftBrace, "Expected '{' after the value being matched", "List the cases of a match between braces.");

        let mut cases = Vec::new();
        while !tokens.check(TokenKind::RightBrace) && !tokens.is_at_end() {
            let condition = Self::case_condition(tokens)?;
            rd_consume!(tokens, arrow @ FatArrow => {
                let body = Self::body(tokens)?;
                cases.push(Case { arrow, condition, body });
            }, "Expected '=>' after the case condition", "Write match cases like `condition => result`.");

            rd_matches!(tokens, Comma);
        }

        rd_consume!(
            tokens,
            RightBrace => Ok(Expr::Match(keyword, Box::new(scrutinee), cases)),
            "Expected '}' after the match cases",
            "Make sure that you close the match with a '}'.")
    }

    rd_term!(case_condition := tokens => Expr : {
        if let Some(wildcard) = rd_matches!(tokens, Underscore) {
            return Ok(Expr::Pattern(Pattern::Wildcard(wildcard)));
        }

        let left = Self::ternary(tokens)?;
        match rd_matches!(tokens, Pipe) {
            Some(pipe) => {
                let right = Self::case_condition(tokens)?;
                Ok(Expr::Pattern(Pattern::Or(Box::new(left), pipe, Box::new(right))))
            },
            None => Ok(left),
        }
    });

    rd_term!(named_function := tokens => Expr : {
        rd_consume!(tokens, LeftParen, "Expected '(' after 'defun'", "Define functions like `defun(name, (params) -> body)`.");
        rd_consume!(tokens, name @ Identifier => {
            rd_consume!(tokens, Comma, "Expected ',' after the function name", "Separate the function name from its parameters with a ','.");
            let decl = Self::function_tail(tokens, Some(name))?;
            rd_consume!(tokens, RightParen => Ok(Expr::Fun(Rc::new(decl))), "Expected ')' to close 'defun'", "Make sure that you close the function definition with a ')'.")
        }, "Expected an identifier as the first argument to 'defun'", "Provide the function name as the first argument.")
    });

    rd_term!(anonymous_function := tokens => Expr : {
        rd_consume!(tokens, LeftParen, "Expected '(' after 'defun'", "Define anonymous functions like `defun((params) -> body)`.");
        let decl = Self::function_tail(tokens, None)?;
        rd_consume!(tokens, RightParen => Ok(Expr::Fun(Rc::new(decl))), "Expected ')' to close 'defun'", "Make sure that you close the function definition with a ')'.")
    });

    fn function_tail(tokens: &mut TokenStream, name: Option<Token>) -> Result<FunDecl, FoxError> {
        rd_consume!(tokens, LeftParen, "Expected '(' before the parameter list", "Functions declare their parameters like `(a, b) -> body`.");

        let mut params = Vec::new();
        if !tokens.check(TokenKind::RightParen) {
            loop {
                rd_consume!(tokens, param @ Identifier => params.push(param), "Expected a parameter name", "Parameters must be plain identifiers.");
                if rd_matches!(tokens, Comma).is_none() {
                    break;
                }
            }
        }

        rd_consume!(tokens, RightParen, "Expected ')' after the parameter list", "Close the parameter list with a ')'.");
        rd_consume!(tokens, Arrow, "Expected '->' after the parameter list", "Separate the parameters from the body with '->'.");

        let body = Self::body(tokens)?;
        Ok(FunDecl { name, params, body })
    }

    /// Whether the upcoming tokens open an arrow function, `(a, b) -> ...`, rather than a grouping.
    fn arrow_ahead(tokens: &TokenStream) -> bool {
        if !tokens.check(TokenKind::LeftParen) {
            return false;
        }

        let mut n = 1;
        if tokens.check_nth(n, TokenKind::Identifier) {
            n += 1;
            while tokens.check_nth(n, TokenKind::Comma) && tokens.check_nth(n + 1, TokenKind::Identifier) {
                n += 2;
            }
        }

        tokens.check_nth(n, TokenKind::RightParen) && tokens.check_nth(n + 1, TokenKind::Arrow)
    }

    rd_term!(body := tokens => Expr : {
        if Self::arrow_ahead(tokens) {
            Ok(Expr::Fun(Rc::new(Self::function_tail(tokens, None)?)))
        } else {
            Self::expression(tokens)
        }
    });

    rd_term!(ternary := tokens => Expr : {
        let cond = Self::or(tokens)?;

        match rd_matches!(tokens, QuestionMark) {
            Some(op) => {
                let then_branch = Self::body(tokens)?;
                rd_consume!(tokens, Colon, "Expected ':' to complete the ternary conditional", "Write ternaries like `condition ? if_true : if_false`.");
                let else_branch = Self::body(tokens)?;
                Ok(Expr::Ternary(Box::new(cond), Box::new(then_branch), Box::new(else_branch), op))
            },
            None => Ok(cond),
        }
    });

    rd_term!(or := and (Or and)* => Logical);

    rd_term!(and := equality (And equality)* => Logical);

    rd_term!(equality := comparison (BangEqual | EqualEqual comparison)* => Binary);

    rd_term!(comparison := term (Greater | GreaterEqual | Less | LessEqual term)* => Binary);

    rd_term!(term := factor (Minus | Plus factor)* => Binary);

    rd_term!(factor := unary (Star | Slash unary)* => Binary);

    rd_term!(unary := tokens => Expr : {
        match rd_matches!(tokens, Bang | Minus) {
            Some(op) => {
                let right = Self::unary(tokens)?;
                Ok(Expr::Unary(op, Box::new(right)))
            },
            None => Self::call(tokens),
        }
    });

    rd_term!(call := tokens => Expr : {
        let mut expr = Self::primary(tokens)?;

        loop {
            if rd_matches!(tokens, LeftParen).is_some() {
                let mut args = Vec::new();
                if !tokens.check(TokenKind::RightParen) {
                    loop {
                        args.push(Self::body(tokens)?);
                        if rd_matches!(tokens, Comma).is_none() {
                            break;
                        }
                    }
                }

                rd_consume!(tokens, close @ RightParen => {
                    expr = Expr::Call(Box::new(expr), args, close);
                }, "Expected ')' after the argument list", "Make sure you close the argument list with a ')'.");
            } else if rd_matches!(tokens, LeftBracket).is_some() {
                let index = Self::expression(tokens)?;
                let upper = if rd_matches!(tokens, Colon).is_some() {
                    Some(Box::new(Self::expression(tokens)?))
                } else {
                    None
                };

                rd_consume!(tokens, close @ RightBracket => {
                    expr = Expr::Index(Box::new(expr), Box::new(index), upper, close);
                }, "Expected ']' after the array index", "Index arrays like `array[index]` or `array[lower:upper]`.");
            } else {
                return Ok(expr);
            }
        }
    });

    rd_term!(primary := tokens => Expr : {
        let Some(token) = tokens.peek() else {
            return Err(errors::syntax_at(
                tokens.end_location(),
                "Reached the end of the input while waiting for an expression.",
                "Make sure that you have provided a valid expression."));
        };

        match token.kind() {
            TokenKind::False => {
                tokens.next();
                Ok(Expr::Literal(Literal::Bool(false)))
            },
            TokenKind::True => {
                tokens.next();
                Ok(Expr::Literal(Literal::Bool(true)))
            },
            TokenKind::Null => {
                tokens.next();
                Ok(Expr::Literal(Literal::Null))
            },
            TokenKind::Number | TokenKind::String => {
                let literal = token.literal().cloned().unwrap_or(Literal::Null);
                tokens.next();
                Ok(Expr::Literal(literal))
            },
            TokenKind::Identifier => {
                rd_consume!(tokens, name @ Identifier => Ok(Expr::Var(ExprId::fresh(), name)), "Expected an identifier", "")
            },
            TokenKind::Defun => {
                tokens.next();
                Self::anonymous_function(tokens)
            },
            TokenKind::LeftBrace => {
                tokens.next();
                Self::block(tokens)
            },
            TokenKind::LeftBracket => {
                tokens.next();
                Self::array(tokens)
            },
            TokenKind::LeftParen => {
                tokens.next();
                let expr = Self::expression(tokens)?;
                rd_consume!(tokens, RightParen => Ok(Expr::Grouping(Box::new(expr))), "Expected ')' after the expression", "Make sure you have a closing parenthesis `)` after the expression.")
            },
            _ => Err(errors::syntax(
                token,
                format!("Expected an expression, but found '{}'.", token.lexeme()),
                "Make sure that you are providing a value, variable, block, array or function at this location.",
            )),
        }
    });

    rd_term!(block := tokens => Expr : {
        let mut exprs = Vec::new();

        while !tokens.check(TokenKind::RightBrace) && !tokens.is_at_end() {
            exprs.push(Self::body(tokens)?);
            rd_matches!(tokens, Comma);
        }

        rd_consume!(tokens, RightBrace => Ok(Expr::Block(exprs)), "Expected '}' after the expression block", "Make sure you have a closing brace `}` after the block.")
    });

    rd_term!(array := tokens => Expr : {
        let mut elements = Vec::new();

        if !tokens.check(TokenKind::RightBracket) {
            loop {
                elements.push(Self::body(tokens)?);
                if rd_matches!(tokens, Comma).is_none() {
                    break;
                }
            }
        }

        rd_consume!(tokens, close @ RightBracket => Ok(Expr::Array(elements, close)), "Expected ']' after the array elements", "Make sure you close the array literal with a ']'.")
    });
}
