/// A function callable from kinetic laws and rules, with its spelling in each
/// output language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub name: &'static str,
    /// Content MathML element applied to the argument.
    pub mathml: &'static str,
    pub matlab: &'static str,
    pub arity: usize,
}

const fn unary(name: &'static str, mathml: &'static str, matlab: &'static str) -> Function {
    Function {
        name,
        mathml,
        matlab,
        arity: 1,
    }
}

/// `ln` is the natural logarithm and `log` the base 10 logarithm, matching
/// `<ln/>` and `<log/>` without a `logbase`.
pub const FUNCTIONS: &[Function] = &[
    unary("exp", "exp", "exp"),
    unary("ln", "ln", "log"),
    unary("log", "log", "log10"),
    unary("sqrt", "root", "sqrt"),
    unary("sin", "sin", "sin"),
    unary("cos", "cos", "cos"),
    unary("tan", "tan", "tan"),
    unary("abs", "abs", "abs"),
    unary("floor", "floor", "floor"),
    unary("ceiling", "ceiling", "ceil"),
];

pub fn function(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

impl Function {
    pub fn check_arity(&self, args: usize) -> Result<(), String> {
        if args == self.arity {
            Ok(())
        } else {
            Err(format!(
                "function '{}' takes {} argument(s), found {}",
                self.name, self.arity, args
            ))
        }
    }
}
