use std::collections::BTreeMap;

use ai_core::StringHash;
use tracing::debug;

use crate::rules::{
    CheckWaitingPoint, EntityInteraction, ForwardLocalEvent, GlobalEvent, GlobalEventStartEnd,
    HandleForwardedLocalEvent, PerceptionEventAction, RandomInterruption, ReactionPoolRule,
    WaitAtWaitingPoint,
};
use crate::{ActionReaction, Reaction, ReactionError, ReactionRule, ReactionWorld, RuleEntry};

/// Startup hook that fills a registry, e.g. with a game's own rules.
pub type RegisterFunction<W> = Box<dyn FnOnce(&mut ReactionRegistry<W>)>;

/// Name-keyed prototypes of rules and reactions; assets instantiate clones of them.
pub struct ReactionRegistry<W: ReactionWorld> {
    rules: BTreeMap<StringHash, Box<dyn ReactionRule<W>>>,
    reactions: BTreeMap<StringHash, Box<dyn Reaction<W>>>,
}

impl<W: ReactionWorld> ReactionRegistry<W> {
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
            reactions: BTreeMap::new(),
        }
    }

    /// Registry with every built-in rule family and reaction installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_rules();
        registry
    }

    /// Register `rule` as the prototype for `name`, replacing any earlier one.
    pub fn register_reaction_rule(&mut self, name: &str, mut rule: Box<dyn ReactionRule<W>>) {
        rule.header_mut().rename(name);
        if self.rules.insert(StringHash::new(name), rule).is_some() {
            debug!(name, "replaced reaction rule prototype");
        }
    }

    /// Register `reaction` under its own name.
    pub fn register_reaction(&mut self, reaction: Box<dyn Reaction<W>>) {
        let name = reaction.name().to_owned();
        if self.reactions.insert(StringHash::new(&name), reaction).is_some() {
            debug!(name, "replaced reaction prototype");
        }
    }

    pub fn create_reaction_rule_by_name(&self, name: &str) -> Option<Box<dyn ReactionRule<W>>> {
        self.rules.get(&StringHash::new(name)).map(|r| r.clone_rule())
    }

    pub fn create_reaction_by_name(&self, name: &str) -> Option<Box<dyn Reaction<W>>> {
        self.reactions
            .get(&StringHash::new(name))
            .map(|r| r.clone_reaction())
    }

    /// Instantiate and configure the rule described by an asset entry.
    pub fn create_rule_from_entry(
        &self,
        entry: &RuleEntry,
    ) -> Result<Box<dyn ReactionRule<W>>, ReactionError> {
        let mut rule = self
            .create_reaction_rule_by_name(&entry.name)
            .ok_or_else(|| ReactionError::UnknownRule(entry.name.clone()))?;
        if let Some(priority) = entry.priority {
            rule.header_mut().priority = priority;
        }
        if let Some(probability) = entry.probability {
            rule.header_mut().set_probability(probability);
        }
        rule.configure(&entry.properties, self)?;
        Ok(rule)
    }

    pub fn contains_rule(&self, name: &str) -> bool {
        self.rules.contains_key(&StringHash::new(name))
    }

    pub fn contains_reaction(&self, name: &str) -> bool {
        self.reactions.contains_key(&StringHash::new(name))
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.values().map(|r| r.name())
    }

    pub fn reaction_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.reactions.values().map(|r| r.name())
    }

    pub fn install_register_functions<I>(&mut self, functions: I)
    where
        I: IntoIterator<Item = RegisterFunction<W>>,
    {
        for register in functions {
            register(self);
        }
    }

    pub fn register_builtin_rules(&mut self) {
        self.register_reaction_rule("PerceptionEventAction", Box::new(PerceptionEventAction::default()));
        self.register_reaction_rule("GlobalEvent", Box::new(GlobalEvent::default()));
        self.register_reaction_rule("GlobalEventStartEnd", Box::new(GlobalEventStartEnd::default()));
        self.register_reaction_rule("ForwardLocalEvent", Box::new(ForwardLocalEvent::default()));
        self.register_reaction_rule(
            "HandleForwardedLocalEvent",
            Box::new(HandleForwardedLocalEvent::default()),
        );
        self.register_reaction_rule(
            "EntityInteraction",
            Box::new(EntityInteraction::<W::Agent>::default()),
        );
        self.register_reaction_rule("RandomInteruption", Box::new(RandomInterruption::default()));
        self.register_reaction_rule(
            "CheckWaitingPoint",
            Box::new(CheckWaitingPoint::<W::Agent>::default()),
        );
        self.register_reaction_rule("WaitAtWaitingPoint", Box::new(WaitAtWaitingPoint::default()));
        self.register_reaction_rule("ReactionPool", Box::new(ReactionPoolRule::<W>::default()));
        self.register_reaction(Box::new(ActionReaction::default()));
    }
}

impl<W: ReactionWorld> Default for ReactionRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
