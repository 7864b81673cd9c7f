use ai_core::{StringHash, TickContext, UpdateInterval};
use ai_perception::{
    PerceptionEvent, PerceptionEventSink, PerceptionState, SandboxBody, SensorComponent,
    SensorConfiguration, SensorPerceptionSystem,
};
use ai_reaction::rules::{
    EntityInteraction, ForwardLocalEvent, GlobalEventStartEnd, HandleForwardedLocalEvent,
    PerceptionEventAction, RandomInterruption,
};
use ai_reaction::{
    tick_frame, ActionKind, ActionRequest, ActionTemplate, ActionWorldMut, EventFilter, ReactionComponent, ReactionRegistry,
    ReactionRule, ReactionRulesTable, ReactionSandbox, ReactionSystem,
};
use glam::Vec3;
use serde_json::{json, Value};

struct Scene {
    world: ReactionSandbox,
    sensors: SensorPerceptionSystem<u64>,
    reactions: ReactionSystem<ReactionSandbox>,
    tick: u64,
    dt: f32,
}

impl Scene {
    fn new(dt: f32) -> Self {
        Self {
            world: ReactionSandbox::new(),
            sensors: SensorPerceptionSystem::new(),
            reactions: ReactionSystem::new(ReactionRegistry::with_builtins()),
            tick: 0,
            dt,
        }
    }

    fn actor(&mut self, entity: u64, position: Vec3, tags: &str) -> &mut Self {
        self.world
            .insert_actor(entity, SandboxBody::new(position).with_tags(tags));
        self
    }

    fn sensor(&mut self, entity: u64, event_id: &str, radius: f32, tags: &str) -> &mut Self {
        self.sensors.insert(
            entity,
            SensorComponent::single(
                SensorConfiguration::new(StringHash::new(event_id), radius)
                    .with_aspect_tags(tags)
                    .with_update_interval(UpdateInterval::every_tick()),
            ),
        );
        self
    }

    fn rule(&mut self, entity: u64, rule: Box<dyn ReactionRule<ReactionSandbox>>) -> &mut Self {
        let mut rules = ReactionRulesTable::new();
        rules.add_rule(rule);
        self.reactions.insert(entity, ReactionComponent::new(rules));
        self
    }

    fn now(&self) -> f64 {
        self.tick as f64 * f64::from(self.dt)
    }

    fn frame(&mut self) -> usize {
        let ctx = TickContext::new(self.tick, self.dt, 3);
        self.tick += 1;
        let acted = tick_frame(&ctx, &mut self.world, &mut self.sensors, &mut self.reactions);
        self.world.tick_actions(self.dt);
        acted
    }

    fn rule_state(&self, entity: u64, name: &str) -> Value {
        self.reactions
            .get(entity)
            .and_then(|c| c.rules().find(StringHash::new(name)))
            .map(|r| r.save_state())
            .unwrap_or(Value::Null)
    }

    fn current_action(&self, entity: u64) -> Option<ActionKind<u64>> {
        self.world
            .plan(entity)
            .and_then(|plan| plan.current())
            .map(|request| request.kind.clone())
    }
}

fn broadcast(event_id: &str, state: PerceptionState) -> PerceptionEvent<u64> {
    PerceptionEvent::new(StringHash::new(event_id), 99, 99, state)
}

#[test]
fn perception_event_action_ignores_ended_events() {
    let mut scene = Scene::new(0.1);
    scene.actor(1, Vec3::ZERO, "guard").rule(
        1,
        Box::new(PerceptionEventAction::new(
            EventFilter::local("Intruder"),
            ActionTemplate::turn_to(false),
        )),
    );

    let ended = PerceptionEvent::new(StringHash::new("Intruder"), 5, 1, PerceptionState::Ended);
    assert!(scene.reactions.push_local(1, ended));
    assert_eq!(scene.frame(), 0);

    let began = ended.with_state(PerceptionState::Began);
    assert!(scene.reactions.push_local(1, began));
    assert_eq!(scene.frame(), 1);
    assert_eq!(
        scene.world.take_pushed()[0].1.kind,
        ActionKind::TurnTo {
            target: 5,
            reverse: false
        }
    );
}

#[test]
fn events_for_entities_without_component_are_dropped() {
    let mut scene = Scene::new(0.1);
    let event = PerceptionEvent::new(StringHash::new("Noise"), 1, 2, PerceptionState::Began);
    assert!(!scene.reactions.push_local(2, event));
}

#[test]
fn global_start_end_pairs_events() {
    let mut scene = Scene::new(0.1);
    scene.actor(1, Vec3::ZERO, "").rule(
        1,
        Box::new(GlobalEventStartEnd::new(
            "PartyStart",
            "PartyEnd",
            ActionTemplate::animation("dance", 0.0, 0.0),
        )),
    );

    // An end without a start does nothing.
    scene
        .reactions
        .push_global_event(broadcast("PartyEnd", PerceptionState::Began));
    assert_eq!(scene.frame(), 0);
    assert_eq!(scene.current_action(1), None);

    scene
        .reactions
        .push_global_event(broadcast("PartyStart", PerceptionState::Began));
    assert_eq!(scene.frame(), 1);
    assert_eq!(
        scene.current_action(1),
        Some(ActionKind::PlayAnimation {
            path: "dance".into(),
            seconds: None
        })
    );
    assert_eq!(scene.rule_state(1, "GlobalEventStartEnd"), json!({ "started": 10 }));

    // The looping animation keeps running until the end broadcast.
    for _ in 0..10 {
        assert_eq!(scene.frame(), 0);
    }
    assert!(scene.current_action(1).is_some());

    scene
        .reactions
        .push_global_event(broadcast("PartyEnd", PerceptionState::Began));
    assert_eq!(scene.frame(), 1);
    assert_eq!(scene.current_action(1), None);
    assert_eq!(scene.rule_state(1, "GlobalEventStartEnd"), json!({ "started": null }));
}

#[test]
fn global_end_keeps_actions_of_other_priorities() {
    let mut scene = Scene::new(0.1);
    scene.actor(1, Vec3::ZERO, "").rule(
        1,
        Box::new(GlobalEventStartEnd::new(
            "PartyStart",
            "PartyEnd",
            ActionTemplate::animation("dance", 0.0, 0.0),
        )),
    );

    scene
        .reactions
        .push_global_event(broadcast("PartyStart", PerceptionState::Began));
    assert_eq!(scene.frame(), 1);

    // Queued behind the dance by someone else, at a higher priority.
    let alarm = ActionRequest::new(ActionKind::Wait { seconds: 100.0 }, 20);
    assert!(scene.world.push_action(1, alarm));

    scene
        .reactions
        .push_global_event(broadcast("PartyEnd", PerceptionState::Began));
    assert_eq!(scene.frame(), 1);
    let plan = scene.world.plan(1).expect("actor has a plan");
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.current_priority(), Some(20));
}

#[test]
fn forwarded_events_reach_every_perceived_entity() {
    const BLAST: u64 = 10;
    let mut scene = Scene::new(0.1);
    scene
        .actor(1, Vec3::new(2.0, 0.0, 0.0), "villager")
        .actor(2, Vec3::new(-3.0, 0.0, 0.0), "villager")
        .actor(3, Vec3::new(40.0, 0.0, 0.0), "villager");
    scene
        .world
        .insert_prop(BLAST, SandboxBody::new(Vec3::ZERO).non_solid());
    scene
        .sensor(BLAST, "ExplosionNear", 5.0, "villager")
        .rule(
            BLAST,
            Box::new(ForwardLocalEvent::new(EventFilter::local("ExplosionNear"), "Flee")),
        );
    for villager in [1, 2, 3] {
        scene.rule(villager, Box::new(HandleForwardedLocalEvent::new("Flee").turning_away()));
    }

    // Villagers are evaluated before the blast, so they react on the next frame.
    assert_eq!(scene.frame(), 1);
    assert_eq!(scene.frame(), 2);

    let flee = ActionKind::TurnTo {
        target: BLAST,
        reverse: true,
    };
    let pushed = scene.world.take_pushed();
    assert_eq!(pushed.len(), 2);
    assert!(pushed.iter().all(|(entity, request)| *entity != 3 && request.kind == flee));
}

#[test]
fn interaction_runs_its_course_and_remembers_partner() {
    let mut scene = Scene::new(0.5);
    for entity in [1, 2] {
        scene
            .actor(entity, Vec3::new(entity as f32, 0.0, 0.0), "npc")
            .sensor(entity, "Nearby", 5.0, "npc")
            .rule(
                entity,
                Box::new(
                    EntityInteraction::<u64>::new(EventFilter::sensor("Nearby")).with_duration(1.0, 1.0),
                ),
            );
    }

    assert_eq!(scene.frame(), 2);
    let state = scene.rule_state(1, "EntityInteraction");
    assert_eq!(state["state"], json!("InteractionStarted"));
    assert_eq!(state["partner"], json!(2));
    assert_eq!(scene.rule_state(2, "EntityInteraction")["partner"], json!(1));

    // t = 0.5
    scene.frame();
    assert_eq!(scene.rule_state(1, "EntityInteraction")["state"], json!("StillInteracting"));

    // t = 1.0: the duration is over.
    scene.frame();
    assert_eq!(scene.rule_state(1, "EntityInteraction")["state"], json!("InteractionEnded"));

    scene.frame();
    let state = scene.rule_state(1, "EntityInteraction");
    assert_eq!(state["state"], json!("NoInteraction"));
    assert_eq!(state["recent"], json!([2]));

    // The only candidate is a recent partner.
    for _ in 0..4 {
        scene.frame();
        assert_eq!(scene.rule_state(1, "EntityInteraction")["state"], json!("NoInteraction"));
    }
}

#[test]
fn interaction_handshake_needs_an_answer() {
    let mut scene = Scene::new(0.5);
    for entity in [1, 2] {
        scene
            .actor(entity, Vec3::new(entity as f32, 0.0, 0.0), "npc")
            .sensor(entity, "Nearby", 5.0, "npc")
            .rule(
                entity,
                Box::new(
                    EntityInteraction::<u64>::new(EventFilter::sensor("Nearby"))
                        .with_acknowledgement("Greet")
                        .with_duration(3.0, 3.0),
                ),
            );
    }

    // 1 asks, 2 answers and starts right away.
    scene.frame();
    let asker = scene.rule_state(1, "EntityInteraction");
    assert_eq!(asker["state"], json!("NoInteraction"));
    assert_eq!(asker["pending"], json!([2, 0.0]));
    let answerer = scene.rule_state(2, "EntityInteraction");
    assert_eq!(answerer["state"], json!("InteractionStarted"));
    assert_eq!(answerer["partner"], json!(1));

    // 1 receives the answer.
    scene.frame();
    let asker = scene.rule_state(1, "EntityInteraction");
    assert_eq!(asker["state"], json!("InteractionStarted"));
    assert_eq!(asker["partner"], json!(2));
    assert_eq!(asker["pending"], Value::Null);
}

#[test]
fn unanswered_request_times_out() {
    let mut scene = Scene::new(0.5);
    scene
        .actor(1, Vec3::ZERO, "npc")
        .sensor(1, "Nearby", 5.0, "npc")
        .rule(
            1,
            Box::new(
                EntityInteraction::<u64>::new(EventFilter::sensor("Nearby")).with_acknowledgement("Greet"),
            ),
        );
    // 2 is perceived but has no reaction component, so it never answers.
    scene.actor(2, Vec3::new(1.0, 0.0, 0.0), "npc");

    scene.frame();
    assert_eq!(scene.rule_state(1, "EntityInteraction")["pending"], json!([2, 0.0]));

    // Waits for the default two seconds, then asks again.
    for _ in 0..3 {
        scene.frame();
        assert_eq!(scene.rule_state(1, "EntityInteraction")["pending"], json!([2, 0.0]));
    }
    let asked_at = scene.now();
    scene.frame();
    assert_eq!(
        scene.rule_state(1, "EntityInteraction")["pending"],
        json!([2, asked_at])
    );
}

#[test]
fn random_interruption_respects_cooldown() {
    let mut scene = Scene::new(0.5);
    scene.actor(1, Vec3::ZERO, "").rule(
        1,
        Box::new(RandomInterruption::new(
            2.0,
            5.0,
            ActionTemplate::animation("scratch", 1.0, 1.0),
        )),
    );

    let mut fired_at = Vec::new();
    for _ in 0..60 {
        let now = scene.now();
        scene.frame();
        if !scene.world.take_pushed().is_empty() {
            fired_at.push(now);
        }
    }

    assert!(fired_at.len() >= 3, "fired at {fired_at:?}");
    assert!(fired_at[0] <= 2.5);
    for pair in fired_at.windows(2) {
        let gap = pair[1] - pair[0];
        assert!((5.0..=7.5).contains(&gap), "gap {gap} in {fired_at:?}");
    }
}
