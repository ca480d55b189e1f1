//! Variable registry with lexical scope frames

use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::value::{ScopeClass, ValueKind, VariableRef};

/// Errors that can occur during registry lookups
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// No visible declaration with this name
    #[error("unknown variable: {name}")]
    Unknown { name: String },
}

/// A declared variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub scope: ScopeClass,
    /// Declared value kind, if any
    pub kind: Option<ValueKind>,
    /// Frame depth the declaration was made at (0 = outermost)
    pub depth: usize,
}

impl Variable {
    pub fn reference(&self) -> VariableRef {
        VariableRef::new(self.name.clone(), self.scope)
    }
}

/// A redeclaration whose kind disagrees with the visible declaration
#[derive(Debug, Clone, PartialEq)]
pub struct KindConflict {
    pub name: String,
    pub previous: ValueKind,
    pub declared: ValueKind,
}

#[derive(Debug, Default)]
struct Frame {
    /// Declarations in order, latest last
    variables: Vec<Variable>,
    by_name: HashMap<String, usize>,
}

impl Frame {
    fn insert(&mut self, variable: Variable) {
        self.by_name
            .insert(variable.name.clone(), self.variables.len());
        self.variables.push(variable);
    }

    fn get(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name).map(|&i| &self.variables[i])
    }

    fn find(&self, var: &VariableRef) -> Option<&Variable> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.name == var.name && v.scope == var.scope)
    }
}

/// Registry of declared variables
///
/// Frames mirror the builder's open scopes. Lookups walk from the innermost
/// frame outward; exited frames are retired and no longer visible.
#[derive(Debug)]
pub struct Registry {
    frames: Vec<Frame>,
    retired: Vec<Frame>,
    conflicts: Vec<KindConflict>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry with an empty root frame
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            retired: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Declare a variable in the innermost frame
    ///
    /// Redeclaration never fails. A kind that disagrees with the currently
    /// visible declaration is recorded as a conflict.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        scope: ScopeClass,
        kind: Option<ValueKind>,
    ) -> VariableRef {
        let name = name.into();
        if let (Some(previous), Some(declared)) = (self.lookup(&name).and_then(|v| v.kind), kind)
        {
            if previous != declared {
                warn!(
                    variable = %name,
                    %previous,
                    %declared,
                    "variable redeclared with a different kind"
                );
                self.conflicts.push(KindConflict {
                    name: name.clone(),
                    previous,
                    declared,
                });
            }
        }

        let depth = self.depth();
        let variable = Variable {
            name,
            scope,
            kind,
            depth,
        };
        let reference = variable.reference();
        self.current_frame().insert(variable);
        reference
    }

    /// Resolve a name to the most recent visible declaration
    pub fn resolve(&self, name: &str) -> Result<VariableRef, RegistryError> {
        self.lookup(name)
            .map(Variable::reference)
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_string(),
            })
    }

    /// Whether a declaration with this exact name and class is visible
    pub fn is_visible(&self, var: &VariableRef) -> bool {
        self.frames.iter().rev().any(|f| f.find(var).is_some())
    }

    /// Push a new lexical frame
    pub fn enter_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Retire the innermost frame; the root frame is never popped
    pub fn exit_scope(&mut self) {
        if self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                self.retired.push(frame);
            }
        }
    }

    /// Current frame depth (0 = root)
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Every declaration made so far, sorted by scope depth
    ///
    /// Within one depth, live frames come before retired ones and each frame
    /// keeps declaration order.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut all: Vec<&Variable> = self
            .frames
            .iter()
            .chain(self.retired.iter())
            .flat_map(|f| f.variables.iter())
            .collect();
        all.sort_by_key(|v| v.depth);
        all
    }

    /// Recorded kind conflicts
    pub fn conflicts(&self) -> &[KindConflict] {
        &self.conflicts
    }

    fn lookup(&self, name: &str) -> Option<&Variable> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    fn current_frame(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_resolve() {
        let mut registry = Registry::new();
        let var = registry.declare("x", ScopeClass::Local, None);
        assert_eq!(var, VariableRef::new("x", ScopeClass::Local));
        assert_eq!(registry.resolve("x"), Ok(var));
    }

    #[test]
    fn test_unknown_variable() {
        let registry = Registry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(RegistryError::Unknown { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_latest_declaration_wins() {
        let mut registry = Registry::new();
        registry.declare("x", ScopeClass::Local, None);
        registry.declare("x", ScopeClass::Saved, None);
        assert_eq!(
            registry.resolve("x"),
            Ok(VariableRef::new("x", ScopeClass::Saved))
        );
        // The earlier declaration stays visible by its exact class
        assert!(registry.is_visible(&VariableRef::new("x", ScopeClass::Local)));
    }

    #[test]
    fn test_nested_scope_visibility() {
        let mut registry = Registry::new();
        registry.declare("outer", ScopeClass::Global, None);
        registry.enter_scope();
        registry.declare("inner", ScopeClass::Local, None);
        assert!(registry.resolve("outer").is_ok());
        assert!(registry.resolve("inner").is_ok());
        registry.exit_scope();
        assert!(registry.resolve("inner").is_err());

        // A sibling scope does not see the retired frame
        registry.enter_scope();
        assert!(registry.resolve("inner").is_err());
        registry.exit_scope();

        // Retired declarations are still listed
        let names: Vec<_> = registry.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
    }

    #[test]
    fn test_kind_conflict_recorded() {
        let mut registry = Registry::new();
        registry.declare("x", ScopeClass::Local, Some(ValueKind::Number));
        registry.declare("x", ScopeClass::Local, Some(ValueKind::Number));
        assert!(registry.conflicts().is_empty());
        registry.declare("x", ScopeClass::Local, Some(ValueKind::Text));
        assert_eq!(
            registry.conflicts(),
            &[KindConflict {
                name: "x".to_string(),
                previous: ValueKind::Number,
                declared: ValueKind::Text,
            }]
        );
        // Still resolvable after the conflict
        assert!(registry.resolve("x").is_ok());
    }

    #[test]
    fn test_root_frame_never_popped() {
        let mut registry = Registry::new();
        registry.declare("x", ScopeClass::Local, None);
        registry.exit_scope();
        assert_eq!(registry.depth(), 0);
        assert!(registry.resolve("x").is_ok());
    }
}
