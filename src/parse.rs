//! Lexing and infix to postfix conversion.

use smol_str::SmolStr;
use std::{
    collections::VecDeque,
    error::Error,
    fmt::{self, Display, Formatter},
};

/// A single lexical token from an expression's text form.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Identifier(SmolStr),
    Operator(BinaryOperator),
    Function(Function),
    LeftParen,
    RightParen,
    Comma,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{}", value),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Operator(op) => write!(f, "{}", op.symbol()),
            Token::Function(function) => write!(f, "{}", function.name()),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// An operation applied to two operands, with its precedence and
/// associativity baked in.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperator {
    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Plus | BinaryOperator::Minus => 2,
            BinaryOperator::Times | BinaryOperator::Divide => 3,
            BinaryOperator::Power => 4,
        }
    }

    /// Everything except `^` associates to the left.
    pub(crate) fn is_right_associative(self) -> bool {
        self == BinaryOperator::Power
    }

    pub(crate) fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOperator::Plus => left + right,
            BinaryOperator::Minus => left - right,
            BinaryOperator::Times => left * right,
            BinaryOperator::Divide => left / right,
            BinaryOperator::Power => left.powf(right),
        }
    }

    fn symbol(self) -> char {
        match self {
            BinaryOperator::Plus => '+',
            BinaryOperator::Minus => '-',
            BinaryOperator::Times => '*',
            BinaryOperator::Divide => '/',
            BinaryOperator::Power => '^',
        }
    }
}

/// The closed set of builtin functions.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Log,
    Ln,
    Sqrt,
    Exp,
}

impl Function {
    fn from_name(name: &str) -> Option<Function> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "arcsin" => Some(Function::Arcsin),
            "arccos" => Some(Function::Arccos),
            "arctan" => Some(Function::Arctan),
            "log" => Some(Function::Log),
            "ln" => Some(Function::Ln),
            "sqrt" => Some(Function::Sqrt),
            "exp" => Some(Function::Exp),
            _ => None,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Arcsin => "arcsin",
            Function::Arccos => "arccos",
            Function::Arctan => "arctan",
            Function::Log => "log",
            Function::Ln => "ln",
            Function::Sqrt => "sqrt",
            Function::Exp => "exp",
        }
    }

    /// Apply the function to one operand.
    ///
    /// Trigonometry works in radians, `log` is base 10 and `ln` is the
    /// natural logarithm. Arguments outside a function's domain come back as
    /// NaN under the usual float semantics.
    pub(crate) fn eval(self, argument: f64) -> f64 {
        match self {
            Function::Sin => argument.sin(),
            Function::Cos => argument.cos(),
            Function::Tan => argument.tan(),
            Function::Arcsin => argument.asin(),
            Function::Arccos => argument.acos(),
            Function::Arctan => argument.atan(),
            Function::Log => argument.log10(),
            Function::Ln => argument.ln(),
            Function::Sqrt => argument.sqrt(),
            Function::Exp => argument.exp(),
        }
    }
}

/// Split an expression's text into tokens.
///
/// Every occurrence of `( ) + - * / ^ ,` becomes a standalone token even
/// when it isn't whitespace separated. Any other maximal run of non-space
/// characters is a single [`Token::Number`] if it fully parses as a decimal
/// literal, a [`Token::Function`] if it names a builtin, and a
/// [`Token::Identifier`] otherwise. There is no illegal-character class:
/// unrecognised characters ride along inside whatever identifier run they
/// fall in.
pub fn tokenize(text: &str) -> VecDeque<Token> {
    let mut spaced = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        match c {
            '(' | ')' | '+' | '-' | '*' | '/' | '^' | ',' => {
                spaced.push(' ');
                spaced.push(c);
                spaced.push(' ');
            },
            other => spaced.push(other),
        }
    }

    spaced.split_whitespace().map(classify).collect()
}

fn classify(word: &str) -> Token {
    match word {
        "(" => Token::LeftParen,
        ")" => Token::RightParen,
        "," => Token::Comma,
        "+" => Token::Operator(BinaryOperator::Plus),
        "-" => Token::Operator(BinaryOperator::Minus),
        "*" => Token::Operator(BinaryOperator::Times),
        "/" => Token::Operator(BinaryOperator::Divide),
        "^" => Token::Operator(BinaryOperator::Power),
        _ => {
            if let Some(function) = Function::from_name(word) {
                Token::Function(function)
            } else if let Ok(number) = word.parse::<f64>() {
                Token::Number(number)
            } else {
                Token::Identifier(word.into())
            }
        },
    }
}

/// An expression in postfix (reverse polish) order.
///
/// Evaluation consumes the sequence, so anything that needs to evaluate the
/// same logical expression more than once clones it first.
#[derive(Debug, Clone, PartialEq)]
pub struct RpnExpr(pub(crate) VecDeque<Token>);

impl RpnExpr {
    pub fn tokens(&self) -> impl Iterator<Item = &Token> + '_ { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Display for RpnExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", token)?;
        }

        Ok(())
    }
}

/// Errors raised while turning an equation's text into postfix form.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The input didn't contain exactly one `=`.
    MalformedEquation { equals_signs: usize },
    /// A parenthesis was left without a partner.
    UnbalancedParenthesis,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedEquation { equals_signs } => write!(
                f,
                "An equation needs exactly one \"=\", found {}",
                equals_signs
            ),
            ParseError::UnbalancedParenthesis => {
                write!(f, "Unbalanced parenthesis")
            },
        }
    }
}

impl Error for ParseError {}

/// Convert an infix token sequence to postfix using the shunting-yard
/// algorithm.
///
/// The input is consumed: by the time this returns, the caller's sequence
/// has been drained into the operator stack and the output queue. On an
/// unbalanced input the partially built queue is discarded and
/// [`ParseError::UnbalancedParenthesis`] comes back instead.
pub fn to_postfix(mut infix: VecDeque<Token>) -> Result<RpnExpr, ParseError> {
    let mut stack: Vec<Token> = Vec::new();
    let mut output: VecDeque<Token> = VecDeque::new();

    while let Some(token) = infix.pop_front() {
        match token {
            Token::Number(_) | Token::Identifier(_) => output.push_back(token),
            Token::Operator(incoming) => {
                loop {
                    let yields = match stack.last() {
                        Some(Token::Operator(on_stack)) => {
                            takes_priority(*on_stack, incoming)
                        },
                        _ => false,
                    };

                    if !yields {
                        break;
                    }
                    if let Some(top) = stack.pop() {
                        output.push_back(top);
                    }
                }

                stack.push(Token::Operator(incoming));
            },
            Token::Function(_) | Token::LeftParen => stack.push(token),
            Token::Comma => {
                // pop down to the opening paren of the surrounding group,
                // leaving the paren itself in place
                while stack.last().map_or(false, |top| *top != Token::LeftParen)
                {
                    if let Some(top) = stack.pop() {
                        output.push_back(top);
                    }
                }
            },
            Token::RightParen => {
                loop {
                    match stack.pop() {
                        Some(Token::LeftParen) => break,
                        Some(top) => output.push_back(top),
                        None => return Err(ParseError::UnbalancedParenthesis),
                    }
                }

                // a function directly below the paren belongs to it
                if let Some(Token::Function(_)) = stack.last() {
                    if let Some(function) = stack.pop() {
                        output.push_back(function);
                    }
                }
            },
        }
    }

    while let Some(top) = stack.pop() {
        if top == Token::LeftParen {
            return Err(ParseError::UnbalancedParenthesis);
        }
        output.push_back(top);
    }

    Ok(RpnExpr(output))
}

fn takes_priority(on_stack: BinaryOperator, incoming: BinaryOperator) -> bool {
    on_stack.precedence() > incoming.precedence()
        || (on_stack.precedence() == incoming.precedence()
            && !incoming.is_right_associative())
}

#[cfg(test)]
mod tokenizer_tests {
    use super::*;

    macro_rules! tokenize_test {
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let mut tokens = tokenize($src);

                assert_eq!(tokens.pop_front(), Some($should_be));
                assert!(tokens.is_empty(), "{:?} should be empty", tokens);
            }
        };
    }

    tokenize_test!(open_paren, "(", Token::LeftParen);
    tokenize_test!(close_paren, ")", Token::RightParen);
    tokenize_test!(comma, ",", Token::Comma);
    tokenize_test!(plus, "+", Token::Operator(BinaryOperator::Plus));
    tokenize_test!(caret, "^", Token::Operator(BinaryOperator::Power));
    tokenize_test!(integer, "31", Token::Number(31.0));
    tokenize_test!(decimal, "3.14", Token::Number(3.14));
    tokenize_test!(sine, "sin", Token::Function(Function::Sin));
    tokenize_test!(base_ten_log, "log", Token::Function(Function::Log));
    tokenize_test!(single_letter, "x", Token::Identifier("x".into()));
    tokenize_test!(
        longer_identifier,
        "deltaTime",
        Token::Identifier("deltaTime".into())
    );
    tokenize_test!(
        strange_characters_stay_in_their_run,
        "x$y",
        Token::Identifier("x$y".into())
    );

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn specials_split_without_whitespace() {
        let got = tokenize("1+2*(x,3)");

        let should_be = vec![
            Token::Number(1.0),
            Token::Operator(BinaryOperator::Plus),
            Token::Number(2.0),
            Token::Operator(BinaryOperator::Times),
            Token::LeftParen,
            Token::Identifier("x".into()),
            Token::Comma,
            Token::Number(3.0),
            Token::RightParen,
        ];

        assert_eq!(Vec::from(got), should_be);
    }
}
