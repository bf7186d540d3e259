//! Command and rule registration
//!
//! Built once at startup with [`RegistryBuilder`], then frozen into a
//! [`Registry`] shared by the coordinator. Every configuration mistake
//! (duplicate command kind, second rule for a kind) surfaces from the
//! builder, never at dispatch time.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use lgc_core::prelude::*;

use crate::command::{Command, CommandDescriptor, Payload};
use crate::state::Snapshot;
use crate::transition::Transition;

/// Outcome of evaluating the rule for a command
pub(crate) enum Evaluation {
    /// Guard accepted; apply produced this transition
    Apply(Transition),
    /// Guard rejected the command
    Rejected,
    /// Payload type does not match the declared one
    Mismatch,
}

trait ErasedRule: Send + Sync {
    fn evaluate(&self, snapshot: &Snapshot, command: &Command) -> Evaluation;
}

struct TypedRule<P, G, A> {
    guard: G,
    apply: A,
    _payload: std::marker::PhantomData<fn(&P)>,
}

impl<P, G, A> ErasedRule for TypedRule<P, G, A>
where
    P: Payload,
    G: Fn(&Snapshot, &P) -> bool + Send + Sync,
    A: Fn(&Snapshot, &P) -> Transition + Send + Sync,
{
    fn evaluate(&self, snapshot: &Snapshot, command: &Command) -> Evaluation {
        let Some(payload) = command.payload::<P>() else {
            return Evaluation::Mismatch;
        };
        if !(self.guard)(snapshot, payload) {
            return Evaluation::Rejected;
        }
        Evaluation::Apply((self.apply)(snapshot, payload))
    }
}

struct Declared {
    payload: TypeId,
    rule: Option<Box<dyn ErasedRule>>,
}

/// Collects command declarations and rules
#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<&'static str, Declared>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a command kind without a rule
    pub fn declare<P: Payload>(&mut self, descriptor: &CommandDescriptor<P>) -> Result<&mut Self> {
        let kind = descriptor.kind();
        if self.entries.contains_key(kind) {
            return Err(Error::DuplicateCommand { kind });
        }
        self.entries.insert(
            kind,
            Declared {
                payload: TypeId::of::<P>(),
                rule: None,
            },
        );
        Ok(self)
    }

    /// Register the rule for `descriptor`, declaring it if needed
    pub fn rule<P, G, A>(
        &mut self,
        descriptor: &CommandDescriptor<P>,
        guard: G,
        apply: A,
    ) -> Result<&mut Self>
    where
        P: Payload,
        G: Fn(&Snapshot, &P) -> bool + Send + Sync + 'static,
        A: Fn(&Snapshot, &P) -> Transition + Send + Sync + 'static,
    {
        let kind = descriptor.kind();
        let entry = self.entries.entry(kind).or_insert(Declared {
            payload: TypeId::of::<P>(),
            rule: None,
        });

        if entry.payload != TypeId::of::<P>() {
            return Err(Error::DuplicateCommand { kind });
        }
        if entry.rule.is_some() {
            return Err(Error::DuplicateRule { kind });
        }

        entry.rule = Some(Box::new(TypedRule {
            guard,
            apply,
            _payload: std::marker::PhantomData,
        }));
        Ok(self)
    }

    pub fn build(self) -> Registry {
        let unruled: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, d)| d.rule.is_none())
            .map(|(kind, _)| *kind)
            .collect();
        if !unruled.is_empty() {
            debug!("commands declared without a rule: {:?}", unruled);
        }
        Registry {
            entries: self.entries,
        }
    }
}

/// Frozen command/rule table
pub struct Registry {
    entries: HashMap<&'static str, Declared>,
}

/// Why a command could not be evaluated
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Lookup {
    UnknownKind,
    NoRule,
}

impl Registry {
    pub fn has_rule(&self, kind: &str) -> bool {
        self.entries.get(kind).is_some_and(|d| d.rule.is_some())
    }

    pub(crate) fn evaluate(
        &self,
        snapshot: &Snapshot,
        command: &Command,
    ) -> std::result::Result<Evaluation, Lookup> {
        let declared = self.entries.get(command.kind()).ok_or(Lookup::UnknownKind)?;
        if declared.payload != command.payload_type_id() {
            return Ok(Evaluation::Mismatch);
        }
        let rule = declared.rule.as_ref().ok_or(Lookup::NoRule)?;
        Ok(rule.evaluate(snapshot, command))
    }
}

fn sorted_kinds(entries: &HashMap<&'static str, Declared>) -> Vec<&'static str> {
    let mut kinds: Vec<_> = entries.keys().copied().collect();
    kinds.sort_unstable();
    kinds
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &sorted_kinds(&self.entries))
            .finish()
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("kinds", &sorted_kinds(&self.entries))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PersistentState;

    const SET: CommandDescriptor<String> = CommandDescriptor::new("test/SET");
    const SET_AS_NUMBER: CommandDescriptor<u64> = CommandDescriptor::new("test/SET");
    const PING: CommandDescriptor<()> = CommandDescriptor::new("test/PING");

    fn set_rule(builder: &mut RegistryBuilder) -> Result<&mut RegistryBuilder> {
        builder.rule(
            &SET,
            |s, p: &String| s.persistent.template != *p,
            |_, p| {
                let p = p.clone();
                Transition::none().update_persistent(move |st| PersistentState {
                    template: p,
                    ..st.clone()
                })
            },
        )
    }

    #[test]
    fn test_duplicate_declare_fails() {
        let mut builder = RegistryBuilder::new();
        builder.declare(&PING).unwrap();
        let err = builder.declare(&PING).unwrap_err();
        assert!(matches!(err, Error::DuplicateCommand { kind: "test/PING" }));
    }

    #[test]
    fn test_declare_with_other_payload_type_fails() {
        let mut builder = RegistryBuilder::new();
        builder.declare(&SET).unwrap();
        let err = builder.declare(&SET_AS_NUMBER).unwrap_err();
        assert!(matches!(err, Error::DuplicateCommand { .. }));
    }

    #[test]
    fn test_duplicate_rule_fails() {
        let mut builder = RegistryBuilder::new();
        set_rule(&mut builder).unwrap();
        let err = set_rule(&mut builder).unwrap_err();
        assert!(matches!(err, Error::DuplicateRule { kind: "test/SET" }));
    }

    #[test]
    fn test_rule_after_declare_is_allowed() {
        let mut builder = RegistryBuilder::new();
        builder.declare(&SET).unwrap();
        set_rule(&mut builder).unwrap();
        let registry = builder.build();
        assert!(registry.has_rule("test/SET"));
    }

    #[test]
    fn test_rule_with_mismatched_declaration_fails() {
        let mut builder = RegistryBuilder::new();
        builder.declare(&SET_AS_NUMBER).unwrap();
        assert!(set_rule(&mut builder).is_err());
    }

    #[test]
    fn test_evaluate_outcomes() {
        let mut builder = RegistryBuilder::new();
        set_rule(&mut builder).unwrap();
        builder.declare(&PING).unwrap();
        let registry = builder.build();
        let snapshot = Snapshot::default();

        assert!(matches!(
            registry.evaluate(&snapshot, &SET.create("api".into())),
            Ok(Evaluation::Apply(_))
        ));
        assert!(matches!(
            registry.evaluate(&snapshot, &SET.create(String::new())),
            Ok(Evaluation::Rejected)
        ));
        assert!(matches!(
            registry.evaluate(&snapshot, &SET_AS_NUMBER.create(5)),
            Ok(Evaluation::Mismatch)
        ));
        assert_eq!(
            registry.evaluate(&snapshot, &PING.command()).err(),
            Some(Lookup::NoRule)
        );
        let unknown = CommandDescriptor::<()>::new("test/UNKNOWN").command();
        assert_eq!(
            registry.evaluate(&snapshot, &unknown).err(),
            Some(Lookup::UnknownKind)
        );
    }
}
