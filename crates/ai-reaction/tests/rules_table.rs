use std::cell::RefCell;
use std::rc::Rc;

use ai_core::{SplitMix64, TickContext};
use ai_perception::{EventOutbox, PerceptionEventQueue, SandboxBody};
use ai_reaction::{
    ActionKind, ActionRequest, ActionWorldMut, Effort, EvaluationParameters, ReactionRule,
    ReactionRulesTable, ReactionSandbox, RuleHeader,
};
use glam::Vec3;

const ACTOR: u64 = 1;

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Clone)]
struct Probe {
    header: RuleHeader,
    acts: bool,
    insists: bool,
    log: Log,
}

impl Probe {
    fn new(name: &str, priority: u32, acts: bool, log: &Log) -> Self {
        Self {
            header: RuleHeader::new(name).with_priority(priority),
            acts,
            insists: false,
            log: Rc::clone(log),
        }
    }

    fn insisting(mut self) -> Self {
        self.insists = true;
        self
    }

    fn with_probability(mut self, probability: f32) -> Self {
        self.header.set_probability(probability);
        self
    }
}

impl ReactionRule<ReactionSandbox> for Probe {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn wants_handling_despite_of_lower_priority(&self) -> bool {
        self.insists
    }

    fn handle(&mut self, _params: &mut EvaluationParameters<'_, ReactionSandbox>) -> bool {
        self.log.borrow_mut().push(self.header.name().to_owned());
        self.acts
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<ReactionSandbox>> {
        Box::new(self.clone())
    }
}

fn world() -> ReactionSandbox {
    let mut world = ReactionSandbox::new();
    world.insert_actor(ACTOR, SandboxBody::new(Vec3::ZERO));
    world
}

fn evaluate(
    table: &mut ReactionRulesTable<ReactionSandbox>,
    world: &mut ReactionSandbox,
    min_priority: u32,
) -> Effort {
    let ctx = TickContext::new(0, 0.1, 1);
    let local = PerceptionEventQueue::new();
    let global = PerceptionEventQueue::new();
    let mut outbox = EventOutbox::new();
    let mut rng = SplitMix64::new(7);
    let mut params = EvaluationParameters {
        ctx: &ctx,
        entity: ACTOR,
        world,
        local: &local,
        global: &global,
        sensors: None,
        outbox: &mut outbox,
        rng: &mut rng,
        has_action_component: true,
    };
    table.update(min_priority, &mut params)
}

fn logged(log: &Log) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

#[test]
fn rules_are_evaluated_by_descending_priority() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new();
    table.add_rule(Box::new(Probe::new("low", 1, false, &log)));
    table.add_rule(Box::new(Probe::new("high", 10, false, &log)));
    table.add_rule(Box::new(Probe::new("mid", 5, false, &log)));

    let priorities: Vec<u32> = table.iter().map(|r| r.priority()).collect();
    assert_eq!(priorities, vec![10, 5, 1]);

    let mut world = world();
    assert_eq!(evaluate(&mut table, &mut world, 0), Effort::Trivial);
    assert_eq!(logged(&log), vec!["high", "mid", "low"]);
}

#[test]
fn first_acting_rule_short_circuits() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new();
    table.add_rule(Box::new(Probe::new("high", 10, false, &log)));
    table.add_rule(Box::new(Probe::new("mid", 5, true, &log)));
    table.add_rule(Box::new(Probe::new("low", 1, true, &log)));

    let mut world = world();
    assert_eq!(evaluate(&mut table, &mut world, 0), Effort::Regular);
    assert_eq!(logged(&log), vec!["high", "mid"]);
}

#[test]
fn equal_priorities_keep_insertion_order() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new();
    table.add_rule(Box::new(Probe::new("first", 3, false, &log)));
    table.add_rule(Box::new(Probe::new("second", 3, false, &log)));
    table.add_rule(Box::new(Probe::new("top", 4, false, &log)));

    let mut world = world();
    evaluate(&mut table, &mut world, 0);
    assert_eq!(logged(&log), vec!["top", "first", "second"]);
}

#[test]
fn minimum_priority_is_a_floor() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new();
    table.add_rule(Box::new(Probe::new("high", 10, false, &log)));
    table.add_rule(Box::new(Probe::new("mid", 5, false, &log)));
    table.add_rule(Box::new(Probe::new("exact", 6, false, &log)));
    table.add_rule(Box::new(Probe::new("insisting", 1, false, &log).insisting()));

    let mut world = world();
    evaluate(&mut table, &mut world, 6);
    assert_eq!(logged(&log), vec!["high", "exact", "insisting"]);
}

#[test]
fn running_action_blocks_rules_up_to_its_priority() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new();
    table.add_rule(Box::new(Probe::new("high", 10, false, &log)));
    table.add_rule(Box::new(Probe::new("same", 7, false, &log)));
    table.add_rule(Box::new(Probe::new("low", 5, false, &log)));
    table.add_rule(Box::new(Probe::new("insisting", 1, false, &log).insisting()));

    let mut world = world();
    assert!(world.push_action(ACTOR, ActionRequest::new(ActionKind::Wait { seconds: 3.0 }, 7)));

    evaluate(&mut table, &mut world, 0);
    assert_eq!(logged(&log), vec!["high", "insisting"]);
}

#[test]
fn probability_gate() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new().with_seed(99);
    table.add_rule(Box::new(Probe::new("never", 10, true, &log).with_probability(0.0)));
    table.add_rule(Box::new(Probe::new("always", 5, false, &log).with_probability(1.0)));

    let mut world = world();
    for _ in 0..200 {
        evaluate(&mut table, &mut world, 0);
    }
    let log = logged(&log);
    assert_eq!(log.len(), 200);
    assert!(log.iter().all(|name| name == "always"));
}

#[test]
fn probability_gate_passes_roughly_its_share() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new().with_seed(5);
    table.add_rule(Box::new(Probe::new("coin", 1, false, &log).with_probability(0.25)));

    let mut world = world();
    for _ in 0..4000 {
        evaluate(&mut table, &mut world, 0);
    }
    let share = logged(&log).len() as f32 / 4000.0;
    assert!((share - 0.25).abs() < 0.03, "share = {share}");
}

#[test]
fn cloned_table_keeps_rules() {
    let log = Log::default();
    let mut table = ReactionRulesTable::new();
    table.add_rule(Box::new(Probe::new("a", 2, false, &log)));
    table.add_rule(Box::new(Probe::new("b", 1, false, &log)));

    let copy = table.clone();
    let names: Vec<&str> = copy.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["a", "b"]);
}
