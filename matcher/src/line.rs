use std::fmt;

use grammar::{ConversionError, Value};

/// Generates an indexed accessor that forwards to the matching `Value` accessor.
macro_rules! arg_accessor {
    ($name:ident, $get:ident, $ty:ty) => {
        pub fn $name(&self, index: usize) -> Result<$ty, ConversionError> {
            self.value(index)?.$get()
        }
    };
}

/// A line that matched a template: the template's name and the arguments
/// extracted along the winning path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    template: String,
    arguments: Vec<Value>,
}

impl LineMatch {
    pub fn new(template: impl Into<String>, arguments: Vec<Value>) -> Self {
        LineMatch {
            template: template.into(),
            arguments,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn into_arguments(self) -> Vec<Value> {
        self.arguments
    }

    pub fn arg_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Argument texts, in order.
    pub fn arg_strings(&self) -> Vec<&str> {
        self.arguments.iter().map(Value::as_str).collect()
    }

    pub fn arg_str(&self, index: usize) -> Result<&str, ConversionError> {
        self.value(index).map(Value::as_str)
    }

    arg_accessor!(arg_bool, as_bool, bool);
    arg_accessor!(arg_i8, as_i8, i8);
    arg_accessor!(arg_u8, as_u8, u8);
    arg_accessor!(arg_i16, as_i16, i16);
    arg_accessor!(arg_i32, as_i32, i32);
    arg_accessor!(arg_i64, as_i64, i64);
    arg_accessor!(arg_u16, as_u16, u16);
    arg_accessor!(arg_u32, as_u32, u32);
    arg_accessor!(arg_u64, as_u64, u64);
    arg_accessor!(arg_f32, as_f32, f32);
    arg_accessor!(arg_f64, as_f64, f64);

    fn value(&self, index: usize) -> Result<&Value, ConversionError> {
        self.arguments
            .get(index)
            .ok_or(ConversionError::MissingArgument(index))
    }
}

impl fmt::Display for LineMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.template)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", arg.as_str())?;
        }
        write!(f, ")")
    }
}
