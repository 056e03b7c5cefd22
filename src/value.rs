//! The host value boundary.
//!
//! The bridge never looks inside the host's value representation. It only
//! asks a value for its category, pulls raw bits or addresses out of it,
//! and builds new values from decoded bytes, all through [`HostValue`].
//! [`Value`] is a small reference implementation used by the tests and
//! benches.

use crate::instance::Instance;
use crate::routine::Routine;
use std::cell::RefCell;
use std::ffi::CString;
use std::fmt;
use std::rc::Rc;

/// Coarse category of a host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Null,
    Integer,
    Float,
    Text,
    Bytes,
    Struct,
    Routine,
    List,
    Other,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Null => "null",
            Category::Integer => "integer",
            Category::Float => "float",
            Category::Text => "text",
            Category::Bytes => "bytes",
            Category::Struct => "struct",
            Category::Routine => "routine",
            Category::List => "list",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Capabilities the bridge needs from the host's value type.
pub trait HostValue: Clone + Sized + 'static {
    fn category(&self) -> Category;

    fn as_integer(&self) -> Option<i64>;

    fn as_float(&self) -> Option<f64>;

    /// Address of the data behind a text or byte-sequence value.
    fn as_address(&self) -> Option<usize>;

    fn as_instance(&self) -> Option<&Instance>;

    fn as_routine(&self) -> Option<&Routine<Self>>;

    fn as_list(&self) -> Option<Vec<Self>>;

    fn null() -> Self;

    fn integer(n: i64) -> Self;

    fn float(f: f64) -> Self;

    fn instance(instance: Instance) -> Self;

    fn list(items: Vec<Self>) -> Self;
}

/// A host function that native code may call back into.
///
/// Returning `Err` is not a recoverable failure on the callback path: the
/// dispatcher aborts the process.
pub trait HostClosure<V>: 'static {
    fn invoke(&self, args: &[V]) -> Result<V, String>;
}

impl<V, F> HostClosure<V> for F
where
    F: Fn(&[V]) -> Result<V, String> + 'static,
{
    fn invoke(&self, args: &[V]) -> Result<V, String> {
        self(args)
    }
}

/// Reference host value.
#[derive(Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(Rc<CString>),
    Bytes(Rc<RefCell<Vec<u8>>>),
    Struct(Instance),
    Routine(Rc<Routine<Value>>),
    List(Rc<Vec<Value>>),
}

impl Value {
    /// Text value; interior NUL bytes truncate the string.
    pub fn text(s: &str) -> Value {
        let bytes = s.split('\0').next().unwrap_or_default();
        Value::Text(Rc::new(CString::new(bytes).unwrap_or_default()))
    }

    pub fn bytes(data: Vec<u8>) -> Value {
        Value::Bytes(Rc::new(RefCell::new(data)))
    }

    pub fn routine(routine: Routine<Value>) -> Value {
        Value::Routine(Rc::new(routine))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl HostValue for Value {
    fn category(&self) -> Category {
        match self {
            Value::Null => Category::Null,
            Value::Int(_) => Category::Integer,
            Value::Float(_) => Category::Float,
            Value::Text(_) => Category::Text,
            Value::Bytes(_) => Category::Bytes,
            Value::Struct(_) => Category::Struct,
            Value::Routine(_) => Category::Routine,
            Value::List(_) => Category::List,
        }
    }

    fn as_integer(&self) -> Option<i64> {
        self.as_int()
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn as_address(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.as_ptr() as usize),
            Value::Bytes(b) => Some(b.borrow().as_ptr() as usize),
            _ => None,
        }
    }

    fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Struct(inst) => Some(inst),
            _ => None,
        }
    }

    fn as_routine(&self) -> Option<&Routine<Self>> {
        match self {
            Value::Routine(r) => Some(r),
            _ => None,
        }
    }

    fn as_list(&self) -> Option<Vec<Self>> {
        match self {
            Value::List(items) => Some(items.as_ref().clone()),
            _ => None,
        }
    }

    fn null() -> Self {
        Value::Null
    }

    fn integer(n: i64) -> Self {
        Value::Int(n)
    }

    fn float(f: f64) -> Self {
        Value::Float(f)
    }

    fn instance(instance: Instance) -> Self {
        Value::Struct(instance)
    }

    fn list(items: Vec<Self>) -> Self {
        Value::List(Rc::new(items))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => *a.borrow() == *b.borrow(),
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Routine(a), Value::Routine(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "#{{{:02x?}}}", b.borrow()),
            Value::Struct(inst) => write!(f, "{:?}", inst),
            Value::Routine(r) => write!(f, "#[routine {:#x}]", r.address()),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
        }
    }
}
