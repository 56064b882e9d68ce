//! The arena owning every module and definition of one compilation session.

use nar_common::{ident, Location};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::definition::Definition;
use crate::solve::SolvingContext;
use crate::ty::Ty;

/// Index of a definition in its [`Program`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DefId(pub u32);

/// Index of a module in its [`Program`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(pub u32);

/// Identity of an upstream syntax node that wants its resolved type back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

#[derive(Debug)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub location: Location,
    /// Definitions in declaration order.
    pub definitions: Vec<DefId>,
}

#[derive(Debug, Default)]
pub struct Program {
    modules: Vec<Module>,
    definitions: Vec<Definition>,
    /// Resolved types of owner nodes, filled as definitions are solved.
    annotations: FxHashMap<NodeId, Ty>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, name: impl Into<String>, location: Location) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Module {
            id,
            name: name.into(),
            location,
            definitions: Vec::new(),
        });
        id
    }

    /// Create an empty definition in `module`.
    ///
    /// The definition gets its own solving context; nodes of its body are
    /// built against it through [`Program::context_mut`].
    pub fn add_definition(&mut self, module: ModuleId, name: impl Into<String>, location: Location) -> DefId {
        let id = DefId(self.definitions.len() as u32);
        self.definitions.push(Definition::new(
            id,
            module,
            name.into(),
            location,
            SolvingContext::new(id),
        ));
        if let Some(m) = self.modules.get_mut(module.0 as usize) {
            m.definitions.push(id);
        }
        id
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0 as usize)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn definition(&self, id: DefId) -> Option<&Definition> {
        self.definitions.get(id.0 as usize)
    }

    pub fn definition_mut(&mut self, id: DefId) -> Option<&mut Definition> {
        self.definitions.get_mut(id.0 as usize)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.iter()
    }

    /// The solving context new nodes of a definition are created in.
    pub fn context_mut(&mut self, id: DefId) -> Option<&mut SolvingContext> {
        self.definition_mut(id)?.context_mut()
    }

    /// Find a definition by module name and definition name.
    pub fn lookup(&self, module: &str, name: &str) -> Option<DefId> {
        let module = self.modules.iter().find(|m| m.name == module)?;
        module
            .definitions
            .iter()
            .copied()
            .find(|id| self.definition(*id).is_some_and(|d| d.name() == name))
    }

    /// `Module.name` of a definition.
    pub fn full_name(&self, id: DefId) -> String {
        match self.definition(id) {
            Some(def) => match self.module(def.module()) {
                Some(module) => ident::full_identifier(&module.name, def.name()),
                None => def.name().to_string(),
            },
            None => format!("<definition {}>", id.0),
        }
    }

    pub fn annotations(&self) -> &FxHashMap<NodeId, Ty> {
        &self.annotations
    }

    pub fn annotation(&self, node: NodeId) -> Option<&Ty> {
        self.annotations.get(&node)
    }

    pub(crate) fn record_annotations(&mut self, resolved: FxHashMap<NodeId, Ty>) {
        self.annotations.extend(resolved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_are_registered_in_their_module() {
        let mut program = Program::new();
        let main = program.add_module("Main", Location::default());
        let f = program.add_definition(main, "f", Location::default());
        let g = program.add_definition(main, "g", Location::default());

        assert_eq!(program.module(main).unwrap().definitions, vec![f, g]);
        assert_eq!(program.lookup("Main", "g"), Some(g));
        assert_eq!(program.lookup("Main", "h"), None);
        assert_eq!(program.full_name(f), "Main.f");
        assert_eq!(program.context_mut(g).unwrap().scope(), g);
    }
}
