//! Built-in functions installed into the global scope before any user code
//! runs.
//!
//! Natives are host-implemented callables: `clock`, the math family
//! (`sqrt`, `sin`, `cos`, `exp`, `log`, `tanh`, `abs`, `floor`, `ceil`,
//! `min`, `max`, `pow`), the randomness pair (`random`, `randomrange`),
//! `sum` over a numeric array, and
//! the `Array` constructor.  Array element access goes through
//! [`array_property`], which hands out per-array `get`/`set` closures and the
//! `length` value.
//!
//! Natives report failures as plain message strings; the interpreter turns
//! them into runtime errors carrying the call-site line.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::class::LoxArray;
use crate::environment::Environment;
use crate::value::{NativeFn, Value};

fn as_number(v: &Value, what: &str) -> Result<f64, String> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(format!("{what} must be a number, got {}.", other.type_name())),
    }
}

fn native(name: &'static str, arity: usize, func: impl Fn(&[Value]) -> Result<Value, String> + 'static) -> Value {
    Value::Native(Rc::new(NativeFn {
        name,
        arity,
        func: Box::new(func),
    }))
}

/// A unary `f64 -> f64` math native.
fn math1(name: &'static str, f: fn(f64) -> f64) -> Value {
    native(name, 1, move |args| {
        let x = as_number(&args[0], "Argument")?;
        Ok(Value::Number(f(x)))
    })
}

/// A binary `(f64, f64) -> f64` math native.
fn math2(name: &'static str, f: fn(f64, f64) -> f64) -> Value {
    native(name, 2, move |args| {
        let a = as_number(&args[0], "First argument")?;
        let b = as_number(&args[1], "Second argument")?;
        Ok(Value::Number(f(a, b)))
    })
}

/// Define every native in `globals`.
pub fn install(globals: &Rc<RefCell<Environment>>) {
    info!("Installing native functions");

    let mut env = globals.borrow_mut();

    env.define(
        "clock",
        native("clock", 0, |_| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| format!("System clock error: {e}."))?;
            Ok(Value::Number(now.as_secs_f64()))
        }),
    );

    env.define("sqrt", math1("sqrt", f64::sqrt));
    env.define("sin", math1("sin", f64::sin));
    env.define("cos", math1("cos", f64::cos));
    env.define("exp", math1("exp", f64::exp));
    env.define("log", math1("log", f64::ln));
    env.define("tanh", math1("tanh", f64::tanh));
    env.define("abs", math1("abs", f64::abs));
    env.define("floor", math1("floor", f64::floor));
    env.define("ceil", math1("ceil", f64::ceil));

    env.define("min", math2("min", f64::min));
    env.define("max", math2("max", f64::max));
    env.define("pow", math2("pow", f64::powf));

    env.define(
        "random",
        native("random", 0, |_| Ok(Value::Number(rand::random::<f64>()))),
    );

    // Uniform in [lo, hi).
    env.define(
        "randomrange",
        native("randomrange", 2, |args| {
            let lo = as_number(&args[0], "First argument")?;
            let hi = as_number(&args[1], "Second argument")?;
            Ok(Value::Number(lo + rand::random::<f64>() * (hi - lo)))
        }),
    );

    env.define(
        "sum",
        native("sum", 1, |args| {
            let Value::Array(array) = &args[0] else {
                return Err("Argument to sum() must be an array.".to_owned());
            };

            let mut total = 0.0;
            for elem in array.elements.borrow().iter() {
                match elem {
                    Value::Number(n) => total += n,
                    _ => return Err("All array elements must be numbers.".to_owned()),
                }
            }

            Ok(Value::Number(total))
        }),
    );

    env.define(
        "Array",
        native("Array", 1, |args| {
            let n = as_number(&args[0], "Array size")?;
            if n < 0.0 || n.fract() != 0.0 {
                return Err("Array size must be a non-negative integer.".to_owned());
            }
            Ok(Value::Array(LoxArray::new(n as usize)))
        }),
    );
}

/// Resolve a property access on an array value.
///
/// `get` and `set` are handed out as natives closing over the array, so
/// `a.get` can be stored and called later; `length` is a plain number.
/// Returns `None` for unknown names (the interpreter reports those).
pub fn array_property(array: &Rc<LoxArray>, name: &str) -> Option<Value> {
    match name {
        "length" => Some(Value::Number(array.len() as f64)),

        "get" => {
            let array = Rc::clone(array);
            Some(native("get", 1, move |args| {
                let idx = array_index(&array, &args[0])?;
                Ok(array.elements.borrow()[idx].clone())
            }))
        }

        "set" => {
            let array = Rc::clone(array);
            Some(native("set", 2, move |args| {
                let idx = array_index(&array, &args[0])?;
                let value = args[1].clone();
                array.elements.borrow_mut()[idx] = value.clone();
                Ok(value)
            }))
        }

        _ => None,
    }
}

/// Validate an index argument against an array's bounds.
fn array_index(array: &Rc<LoxArray>, v: &Value) -> Result<usize, String> {
    let n = as_number(v, "Array index")?;

    if n < 0.0 || n.fract() != 0.0 {
        return Err(format!("Array index must be a non-negative integer, got {v}."));
    }

    let idx = n as usize;
    let len = array.len();

    if idx >= len {
        return Err(format!("Array index {idx} out of bounds for length {len}."));
    }

    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(v: &Value, args: &[Value]) -> Result<Value, String> {
        match v {
            Value::Native(f) => (f.func)(args),
            _ => panic!("not a native"),
        }
    }

    #[test]
    fn math_natives_compute() {
        let globals = Environment::new();
        install(&globals);

        let sqrt = globals.borrow().get("sqrt").unwrap();
        assert_eq!(call(&sqrt, &[Value::Number(9.0)]).unwrap(), Value::Number(3.0));

        let maxf = globals.borrow().get("max").unwrap();
        assert_eq!(
            call(&maxf, &[Value::Number(1.0), Value::Number(7.0)]).unwrap(),
            Value::Number(7.0)
        );
    }

    #[test]
    fn math_natives_reject_non_numbers() {
        let globals = Environment::new();
        install(&globals);

        let sqrt = globals.borrow().get("sqrt").unwrap();
        assert!(call(&sqrt, &[Value::String("9".into())]).is_err());
    }

    #[test]
    fn sum_totals_numeric_arrays_only() {
        let globals = Environment::new();
        install(&globals);
        let sum = globals.borrow().get("sum").unwrap();

        let arr = LoxArray::new(2);
        arr.elements.borrow_mut()[0] = Value::Number(1.5);
        arr.elements.borrow_mut()[1] = Value::Number(2.5);
        assert_eq!(
            call(&sum, &[Value::Array(Rc::clone(&arr))]).unwrap(),
            Value::Number(4.0)
        );

        // Unset slots are nil, which is not summable.
        let holey = LoxArray::new(1);
        assert!(call(&sum, &[Value::Array(holey)]).is_err());
        assert!(call(&sum, &[Value::Number(3.0)]).is_err());
    }

    #[test]
    fn array_get_set_length() {
        let arr = LoxArray::new(2);

        let set = array_property(&arr, "set").unwrap();
        call(&set, &[Value::Number(0.0), Value::Number(42.0)]).unwrap();

        let get = array_property(&arr, "get").unwrap();
        assert_eq!(call(&get, &[Value::Number(0.0)]).unwrap(), Value::Number(42.0));
        assert_eq!(call(&get, &[Value::Number(1.0)]).unwrap(), Value::Nil);

        assert_eq!(array_property(&arr, "length"), Some(Value::Number(2.0)));
        assert_eq!(array_property(&arr, "push"), None);
    }

    #[test]
    fn array_indexing_is_bounds_checked() {
        let arr = LoxArray::new(2);
        let get = array_property(&arr, "get").unwrap();

        assert!(call(&get, &[Value::Number(2.0)]).is_err());
        assert!(call(&get, &[Value::Number(-1.0)]).is_err());
        assert!(call(&get, &[Value::Number(0.5)]).is_err());
    }

    #[test]
    fn array_native_validates_size() {
        let globals = Environment::new();
        install(&globals);

        let array = globals.borrow().get("Array").unwrap();
        assert!(call(&array, &[Value::Number(-1.0)]).is_err());
        assert!(call(&array, &[Value::Number(2.5)]).is_err());

        match call(&array, &[Value::Number(3.0)]).unwrap() {
            Value::Array(a) => assert_eq!(a.len(), 3),
            other => panic!("expected array, got {other}"),
        }
    }
}
