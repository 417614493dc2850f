//! Built-in formula functions
//!
//! Functions are looked up by exact (case-sensitive) name. The registry checks
//! argument counts before dispatching; each implementation checks its own
//! argument types. Every failure is reported as a `Value::Error`.

pub mod math;

use std::collections::HashMap;
use std::sync::OnceLock;

use tabula_core::Value;

/// Function implementation signature
pub type FunctionImpl = fn(&[Value]) -> Value;

/// Function definition
pub struct FunctionDef {
    /// Function name as written in formulas
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Human readable arity, as used in argument count errors
    fn expected_args(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None if self.min_args == 0 => "Any number of".to_string(),
            None => format!("More than {}", self.min_args - 1),
        }
    }

    fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the shared registry of built-in functions
pub fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Call a function by name with already evaluated arguments
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        let Some(func) = self.get(name) else {
            return Value::error(format!("No function named: `{}`", name));
        };

        // Check argument count
        if !func.accepts(args.len()) {
            return Value::error(format!(
                "Function: `{}` takes: {} arguments, got: {}",
                func.name,
                func.expected_args(),
                args.len()
            ));
        }

        (func.implementation)(args)
    }

    fn register_math_functions(&mut self) {
        // Pi
        self.register(FunctionDef {
            name: "Pi",
            min_args: 0,
            max_args: Some(0),
            implementation: math::fn_pi,
        });

        // Sqrt
        self.register(FunctionDef {
            name: "Sqrt",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_sqrt,
        });

        // Abs
        self.register(FunctionDef {
            name: "Abs",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
        });

        // Sum
        self.register(FunctionDef {
            name: "Sum",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sum,
        });

        // Min
        self.register(FunctionDef {
            name: "Min",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
        });

        // Max
        self.register(FunctionDef {
            name: "Max",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
        });

        // Average
        self.register(FunctionDef {
            name: "Average",
            min_args: 1,
            max_args: None,
            implementation: math::fn_average,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
