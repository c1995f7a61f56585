//! Calculator tools

use mcp_server::protocol::ToolCallResult;
use mcp_server::registry::RegistryBuilder;
use mcp_server::{Arguments, FieldSpec, InputSchema, RegistryError, ToolDescriptor, ToolError, ToolResult};

/// Operations understood by the `calculate` tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Sqrt,
}

impl Operation {
    pub const NAMES: &'static [&'static str] = &["add", "subtract", "multiply", "divide", "power", "sqrt"];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "multiply" => Some(Self::Multiply),
            "divide" => Some(Self::Divide),
            "power" => Some(Self::Power),
            "sqrt" => Some(Self::Sqrt),
            _ => None,
        }
    }

    /// Evaluate, returning the rendered expression and its value
    ///
    /// A missing `b` falls back to the identity for add, subtract and
    /// multiply, and to 2 for power.
    pub fn apply(self, a: f64, b: Option<f64>) -> Result<(String, f64), ToolError> {
        let n = format_number;
        Ok(match self {
            Self::Add => {
                let b = b.unwrap_or(0.0);
                (format!("{} + {}", n(a), n(b)), a + b)
            }
            Self::Subtract => {
                let b = b.unwrap_or(0.0);
                (format!("{} - {}", n(a), n(b)), a - b)
            }
            Self::Multiply => {
                let b = b.unwrap_or(1.0);
                (format!("{} × {}", n(a), n(b)), a * b)
            }
            Self::Divide => match b {
                Some(b) if b != 0.0 => (format!("{} ÷ {}", n(a), n(b)), a / b),
                _ => {
                    return Err(ToolError::failed(
                        "Error: division requires a non-zero second number",
                    ))
                }
            },
            Self::Power => {
                let b = b.unwrap_or(2.0);
                (format!("{}^{}", n(a), n(b)), a.powf(b))
            }
            Self::Sqrt => {
                if a < 0.0 {
                    return Err(ToolError::failed(
                        "Error: cannot take the square root of a negative number",
                    ));
                }
                (format!("√{}", n(a)), a.sqrt())
            }
        })
    }
}

/// Render a number the way JSON clients expect: `5` rather than `5.0`
///
/// Magnitudes from 1e21 up and below 1e-6 switch to exponent notation
/// (`1e+21`, `1.5e-7`), as JavaScript number formatting does.
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        // Drops the sign of -0
        return "0".to_string();
    }

    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) && !value.is_nan() {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }
    value.to_string()
}

fn operands() -> InputSchema {
    InputSchema::new()
        .field("a", FieldSpec::number("First operand"))
        .field("b", FieldSpec::number("Second operand"))
}

async fn add(args: Arguments) -> ToolResult {
    binary(&args, Operation::Add)
}

async fn subtract(args: Arguments) -> ToolResult {
    binary(&args, Operation::Subtract)
}

async fn multiply(args: Arguments) -> ToolResult {
    binary(&args, Operation::Multiply)
}

async fn divide(args: Arguments) -> ToolResult {
    if args.number("b")? == 0.0 {
        return Err(ToolError::failed("Error: division by zero"));
    }
    binary(&args, Operation::Divide)
}

fn binary(args: &Arguments, operation: Operation) -> ToolResult {
    let (expression, result) = operation.apply(args.number("a")?, Some(args.number("b")?))?;
    Ok(ToolCallResult::text(format!("{} = {}", expression, format_number(result))))
}

async fn calculate(args: Arguments) -> ToolResult {
    let name = args.string("operation")?;
    let operation = Operation::parse(name)
        .ok_or_else(|| ToolError::invalid_argument("operation", format!("unknown operation {}", name)))?;

    let (expression, result) = operation.apply(args.number("a")?, args.opt_number("b")?)?;
    Ok(ToolCallResult::text(format!("{} = {}", expression, format_number(result))))
}

pub(crate) fn register(builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError> {
    builder
        .tool(
            ToolDescriptor::new("add", add)
                .with_title("Addition")
                .with_description("Add two numbers")
                .with_schema(operands()),
        )?
        .tool(
            ToolDescriptor::new("subtract", subtract)
                .with_title("Subtraction")
                .with_description("Subtract the second number from the first")
                .with_schema(
                    InputSchema::new()
                        .field("a", FieldSpec::number("Minuend"))
                        .field("b", FieldSpec::number("Subtrahend")),
                ),
        )?
        .tool(
            ToolDescriptor::new("multiply", multiply)
                .with_title("Multiplication")
                .with_description("Multiply two numbers")
                .with_schema(operands()),
        )?
        .tool(
            ToolDescriptor::new("divide", divide)
                .with_title("Division")
                .with_description("Divide the first number by the second")
                .with_schema(
                    InputSchema::new()
                        .field("a", FieldSpec::number("Dividend"))
                        .field("b", FieldSpec::number("Divisor")),
                ),
        )?
        .tool(
            ToolDescriptor::new("calculate", calculate)
                .with_title("Calculator")
                .with_description("Add, subtract, multiply, divide, raise to a power or take a square root")
                .with_schema(
                    InputSchema::new()
                        .field("operation", FieldSpec::one_of(Operation::NAMES, "Operation to perform"))
                        .field("a", FieldSpec::number("First number"))
                        .field(
                            "b",
                            FieldSpec::number("Second number (not needed for sqrt)").optional(),
                        ),
                ),
        )
}
