use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ai_core::{SplitMix64, TickContext};
use ai_perception::{EventOutbox, PerceptionEvent, PerceptionEventQueue, SandboxBody};
use ai_reaction::{
    ActionReaction, ActionTemplate, EvaluationParameters, Reaction, ReactionPool,
    ReactionPoolAsset, ReactionRegistry, ReactionSandbox, RuleHeader,
};
use glam::Vec3;
use serde_json::json;

const ACTOR: u64 = 1;

type Hits = Rc<RefCell<BTreeMap<String, u32>>>;

#[derive(Clone)]
struct Counting {
    header: RuleHeader,
    accepts: bool,
    hits: Hits,
}

impl Counting {
    fn boxed(name: &str, probability: f32, accepts: bool, hits: &Hits) -> Box<dyn Reaction<ReactionSandbox>> {
        Box::new(Self {
            header: RuleHeader::new(name).with_probability(probability),
            accepts,
            hits: Rc::clone(hits),
        })
    }
}

impl Reaction<ReactionSandbox> for Counting {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(
        &mut self,
        _params: &mut EvaluationParameters<'_, ReactionSandbox>,
        _trigger: Option<&PerceptionEvent<u64>>,
    ) -> bool {
        *self.hits.borrow_mut().entry(self.header.name().to_owned()).or_default() += 1;
        self.accepts
    }

    fn clone_reaction(&self) -> Box<dyn Reaction<ReactionSandbox>> {
        Box::new(self.clone())
    }
}

/// Run `f` with evaluation parameters for `ACTOR` in a fresh sandbox.
fn with_params<R>(f: impl FnOnce(&mut EvaluationParameters<'_, ReactionSandbox>) -> R) -> R {
    let mut world = ReactionSandbox::new();
    world.insert_actor(ACTOR, SandboxBody::new(Vec3::ZERO));
    let ctx = TickContext::new(0, 0.1, 1);
    let local = PerceptionEventQueue::new();
    let global = PerceptionEventQueue::new();
    let mut outbox = EventOutbox::new();
    let mut rng = SplitMix64::new(3);
    let mut params = EvaluationParameters {
        ctx: &ctx,
        entity: ACTOR,
        world: &mut world,
        local: &local,
        global: &global,
        sensors: None,
        outbox: &mut outbox,
        rng: &mut rng,
        has_action_component: true,
    };
    f(&mut params)
}

#[test]
fn selection_order_is_most_likely_first() {
    let hits = Hits::default();
    let mut pool = ReactionPool::new();
    pool.add_reaction(Counting::boxed("rare", 0.1, true, &hits));
    pool.add_reaction(Counting::boxed("common", 0.6, true, &hits));
    pool.add_reaction(Counting::boxed("sometimes", 0.3, true, &hits));

    assert_eq!(pool.reaction(0).name(), "common");
    assert_eq!(pool.reaction(1).name(), "sometimes");
    assert_eq!(pool.reaction(2).name(), "rare");
    assert!((pool.probability_range() - 1.0).abs() < 1e-6);
}

#[test]
fn selection_follows_probabilities() {
    let hits = Hits::default();
    let mut pool = ReactionPool::new().with_seed(11);
    pool.add_reaction(Counting::boxed("a", 0.6, true, &hits));
    pool.add_reaction(Counting::boxed("b", 0.3, true, &hits));
    pool.add_reaction(Counting::boxed("c", 0.1, true, &hits));

    const RUNS: u32 = 10_000;
    with_params(|params| {
        for _ in 0..RUNS {
            assert!(pool.execute_reaction(params, None, 1));
        }
    });

    let hits = hits.borrow();
    for (name, expected) in [("a", 0.6), ("b", 0.3), ("c", 0.1)] {
        let share = f64::from(hits[name]) / f64::from(RUNS);
        assert!((share - expected).abs() < 0.03, "{name}: {share}");
    }
}

#[test]
fn declined_reaction_is_retried() {
    let hits = Hits::default();
    let mut pool = ReactionPool::new().with_seed(2);
    pool.add_reaction(Counting::boxed("picky", 0.9, false, &hits));
    pool.add_reaction(Counting::boxed("willing", 0.1, true, &hits));

    with_params(|params| {
        for _ in 0..100 {
            assert!(pool.execute_reaction(params, None, 200));
        }
    });
    assert_eq!(hits.borrow()["willing"], 100);
}

#[test]
fn single_try_can_fail() {
    let hits = Hits::default();
    let mut pool = ReactionPool::new().with_seed(4);
    pool.add_reaction(Counting::boxed("picky", 0.9, false, &hits));
    pool.add_reaction(Counting::boxed("willing", 0.1, true, &hits));

    let successes = with_params(|params| {
        (0..1000)
            .filter(|_| pool.execute_reaction(params, None, 1))
            .count()
    });
    assert!(successes > 50 && successes < 150, "successes = {successes}");
}

#[test]
fn range_above_sum_leaves_room_for_nothing() {
    let hits = Hits::default();
    let mut pool = ReactionPool::new().with_seed(8);
    pool.add_reaction(Counting::boxed("only", 1.0, true, &hits));
    pool.set_probability_range(Some(2.0));

    let selected = (0..4000).filter(|_| pool.select_reaction().is_some()).count();
    let share = selected as f32 / 4000.0;
    assert!((share - 0.5).abs() < 0.05, "share = {share}");
}

#[test]
fn empty_pool_selects_nothing() {
    let mut pool = ReactionPool::<ReactionSandbox>::new();
    assert_eq!(pool.select_reaction(), None);
    assert!(!with_params(|params| pool.execute_reaction(params, None, 3)));
}

#[test]
fn action_reaction_targets_the_trigger() {
    let mut reaction = ActionReaction::new("Look", ActionTemplate::turn_to(false));
    let trigger = PerceptionEvent::new(
        ai_core::StringHash::new("Noise"),
        42,
        ACTOR,
        ai_perception::PerceptionState::Began,
    );
    let pushed = with_params(|params| {
        assert!(Reaction::handle(&mut reaction, params, Some(&trigger)));
        params.current_action_priority()
    });
    assert_eq!(pushed, Some(ai_reaction::rule::DEFAULT_RULE_PRIORITY));
}

#[test]
fn pool_asset_skips_unknown_reactions() {
    let registry = ReactionRegistry::<ReactionSandbox>::with_builtins();
    let asset = ReactionPoolAsset::from_json(&json!({
        "ProbabilityRange": 3.0,
        "Reactions": [
            { "Name": "ActionReaction", "Probability": 0.5, "Action": "Wait", "MinDuration": 1.0 },
            { "Name": "DoesNotExist", "Probability": 0.5 },
            { "Name": "ActionReaction", "Probability": 0.25, "MinDuration": -1.0 }
        ]
    }))
    .unwrap();

    let mut pool = ReactionPool::from_asset(&asset, &registry);
    assert_eq!(pool.len(), 1);
    assert!((pool.probability_range() - 3.0).abs() < 1e-6);
    assert!((pool.reaction(0).probability() - 0.5).abs() < 1e-6);
}
