//! The subject: the face → value environment the generator lowers under.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ir::Value;

/// Persistent face → value map.
///
/// `with` leaves `self` untouched and returns a new snapshot, so both arms
/// of a conditional can be lowered from the same environment. The map is
/// shared until a snapshot is extended, at which point it is cloned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    faces: Rc<BTreeMap<String, Value>>,
}

impl Subject {
    pub fn new() -> Self {
        Subject::default()
    }

    pub fn get(&self, face: &str) -> Option<&Value> {
        self.faces.get(face)
    }

    /// A later binding of the same face replaces the earlier one.
    pub fn with(&self, face: impl Into<String>, value: Value) -> Subject {
        let mut faces = Rc::clone(&self.faces);
        Rc::make_mut(&mut faces).insert(face.into(), value);
        Subject { faces }
    }

    /// Faces bound to runtime data, sorted by name. Function handles are
    /// left out.
    pub fn data_faces(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.faces
            .iter()
            .filter(|(_, value)| value.as_func().is_none())
            .map(|(face, value)| (face.as_str(), value))
    }

    /// Faces bound to function handles, sorted by name.
    pub fn function_faces(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.faces
            .iter()
            .filter(|(_, value)| value.as_func().is_some())
            .map(|(face, value)| (face.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncId, Ty};

    fn atom(value: i64) -> Value {
        Value::Const {
            ty: Ty::Int(32),
            value,
        }
    }

    #[test]
    fn with_leaves_the_original_snapshot_alone() {
        let base = Subject::new().with("a", atom(1));
        let extended = base.with("b", atom(2));
        assert!(base.get("b").is_none());
        assert_eq!(extended.get("a"), Some(&atom(1)));
        assert_eq!(extended.get("b"), Some(&atom(2)));
    }

    #[test]
    fn rebinding_overwrites() {
        let subject = Subject::new().with("a", atom(1)).with("a", atom(8));
        assert_eq!(subject.get("a"), Some(&atom(8)));
        assert_eq!(subject.data_faces().count(), 1);
    }

    #[test]
    fn faces_come_out_sorted() {
        let subject = Subject::new()
            .with("n", atom(1))
            .with("acc", atom(1))
            .with("b", atom(2));
        let faces: Vec<_> = subject.data_faces().map(|(face, _)| face).collect();
        assert_eq!(faces, ["acc", "b", "n"]);
    }

    #[test]
    fn separates_data_from_functions() {
        let subject = Subject::new()
            .with("f", Value::Func(FuncId(0)))
            .with("a", atom(1));
        let data: Vec<_> = subject.data_faces().map(|(face, _)| face).collect();
        let funcs: Vec<_> = subject.function_faces().map(|(face, _)| face).collect();
        assert_eq!(data, ["a"]);
        assert_eq!(funcs, ["f"]);
    }
}
