use ai_core::{StringHash, TickContext, UpdateInterval};
use ai_perception::{
    EventOutbox, PerceptionState, PerceptionWorldView, ProcessingParameters, SandboxBody,
    SandboxWorld, SensorComponent, SensorConfiguration, SensorFlags,
};
use glam::Vec3;

const PERCEIVER: u64 = 1;
const SEEN: StringHash = StringHash::new("seen");

fn world_with_perceiver() -> SandboxWorld {
    let mut world = SandboxWorld::new();
    world.insert(PERCEIVER, SandboxBody::new(Vec3::ZERO).with_tags("guard"));
    world
}

fn place(world: &mut SandboxWorld, entity: u64, x: f32) {
    world.insert(entity, SandboxBody::new(Vec3::new(x, 0.0, 0.0)).with_tags("civilian"));
}

fn scan(sensor: &mut SensorComponent<u64>, world: &SandboxWorld) -> EventOutbox<u64> {
    let mut outbox = EventOutbox::new();
    let params = ProcessingParameters::forced(PERCEIVER, world);
    assert!(sensor.update(&params, &mut outbox));
    outbox
}

fn state_of(sensor: &SensorComponent<u64>, entity: u64) -> Option<PerceptionState> {
    sensor.sensors()[0].find_perception(entity).map(|p| p.state)
}

#[test]
fn began_continued_ended_across_scans() {
    let mut world = world_with_perceiver();
    let mut sensor =
        SensorComponent::single(SensorConfiguration::new(SEEN, 10.0).with_aspect_tags("civilian"));

    // k: E2 appears.
    place(&mut world, 2, 3.0);
    scan(&mut sensor, &world);
    assert_eq!(state_of(&sensor, 2), Some(PerceptionState::Began));

    // k+1: still there.
    scan(&mut sensor, &world);
    assert_eq!(state_of(&sensor, 2), Some(PerceptionState::Continued));

    // k+2: moved out of range -> reported ended once.
    world.set_position(2, Vec3::new(50.0, 0.0, 0.0));
    scan(&mut sensor, &world);
    assert_eq!(state_of(&sensor, 2), Some(PerceptionState::Ended));

    // k+3: no longer reported at all.
    scan(&mut sensor, &world);
    assert_eq!(state_of(&sensor, 2), None);
    assert_eq!(sensor.perception_count(), 0);
    assert!(!sensor.may_have_events());
}

#[test]
fn returning_entity_begins_again() {
    let mut world = world_with_perceiver();
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0));
    place(&mut world, 2, 3.0);
    scan(&mut sensor, &world);

    world.set_position(2, Vec3::new(50.0, 0.0, 0.0));
    scan(&mut sensor, &world);
    assert_eq!(state_of(&sensor, 2), Some(PerceptionState::Ended));

    world.set_position(2, Vec3::new(2.0, 0.0, 0.0));
    scan(&mut sensor, &world);
    assert_eq!(state_of(&sensor, 2), Some(PerceptionState::Began));
}

#[test]
fn ending_perceptions_can_be_suppressed() {
    let mut world = world_with_perceiver();
    let flags = SensorFlags {
        record_ending_perceptions: false,
        ..SensorFlags::default()
    };
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0).with_flags(flags));
    place(&mut world, 2, 3.0);
    scan(&mut sensor, &world);

    world.remove(2);
    let outbox = scan(&mut sensor, &world);
    assert_eq!(sensor.perception_count(), 0);
    assert!(outbox.is_empty());
}

#[test]
fn unrecorded_ending_still_flags_events() {
    let mut world = world_with_perceiver();
    let flags = SensorFlags {
        record_ending_perceptions: false,
        ..SensorFlags::default()
    };
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0).with_flags(flags));
    place(&mut world, 2, 3.0);
    scan(&mut sensor, &world);
    assert!(sensor.may_have_events());

    world.set_position(2, Vec3::new(50.0, 0.0, 0.0));
    scan(&mut sensor, &world);
    assert_eq!(sensor.perception_count(), 0);
    assert!(sensor.may_have_events());

    scan(&mut sensor, &world);
    assert!(!sensor.may_have_events());
}

#[test]
fn events_follow_enabled_transitions() {
    let mut world = world_with_perceiver();
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0));
    place(&mut world, 2, 3.0);

    let outbox = scan(&mut sensor, &world);
    assert_eq!(outbox.local.len(), 1);
    let (target, event) = outbox.local[0];
    assert_eq!(target, PERCEIVER);
    assert_eq!(event.entity, 2);
    assert_eq!(event.perceived_by, PERCEIVER);
    assert_eq!(event.event_id, SEEN);
    assert_eq!(event.state, PerceptionState::Began);

    // Continued does not fire by default.
    let outbox = scan(&mut sensor, &world);
    assert!(outbox.local.is_empty());

    world.remove(2);
    let outbox = scan(&mut sensor, &world);
    assert_eq!(outbox.local.len(), 1);
    assert_eq!(outbox.local[0].1.state, PerceptionState::Ended);
}

#[test]
fn perceived_entities_receive_swapped_events() {
    let mut world = world_with_perceiver();
    let flags = SensorFlags {
        auto_push_events: false,
        auto_push_events_to_perceived_entities: true,
        ..SensorFlags::default()
    };
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0).with_flags(flags));
    place(&mut world, 2, 3.0);
    place(&mut world, 3, -4.0);

    let outbox = scan(&mut sensor, &world);
    let targets: Vec<u64> = outbox.local.iter().map(|(t, _)| *t).collect();
    assert_eq!(targets, vec![2, 3]);
    for (target, event) in &outbox.local {
        assert_eq!(event.perceived_by, *target);
        assert_eq!(event.entity, PERCEIVER);
    }
}

#[test]
fn untagged_and_mismatched_entities_are_not_perceived() {
    let mut world = world_with_perceiver();
    world.insert(2, SandboxBody::new(Vec3::new(1.0, 0.0, 0.0)));
    world.insert(3, SandboxBody::new(Vec3::new(2.0, 0.0, 0.0)).with_tags("vehicle"));
    place(&mut world, 4, 3.0);

    let mut sensor =
        SensorComponent::single(SensorConfiguration::new(SEEN, 10.0).with_aspect_tags("civilian"));
    scan(&mut sensor, &world);
    let seen: Vec<u64> = sensor.sensors()[0].perceptions().iter().map(|p| p.entity).collect();
    assert_eq!(seen, vec![4]);

    // The wildcard filter takes every tagged entity, but not the untagged one or the owner.
    let mut wildcard = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0));
    scan(&mut wildcard, &world);
    let seen: Vec<u64> = wildcard.sensors()[0].perceptions().iter().map(|p| p.entity).collect();
    assert_eq!(seen, vec![3, 4]);
}

#[test]
fn non_positive_radius_disables_detection() {
    let mut world = world_with_perceiver();
    place(&mut world, 2, 0.5);
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 0.0));
    let outbox = scan(&mut sensor, &world);
    assert_eq!(sensor.perception_count(), 0);
    assert!(outbox.is_empty());
}

#[test]
fn offset_moves_the_sensor_center_with_the_owner_rotation() {
    let mut world = SandboxWorld::new();
    let facing_x = glam::Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
    world.insert(
        PERCEIVER,
        SandboxBody::new(Vec3::ZERO).with_transform(
            ai_perception::Transform::from_position(Vec3::ZERO).with_rotation(facing_x),
        ),
    );
    // +Z rotated by 90 degrees around Y points to +X.
    place(&mut world, 2, 20.0);
    place(&mut world, 3, -20.0);

    let mut sensor = SensorComponent::single(
        SensorConfiguration::new(SEEN, 5.0).with_offset(Vec3::new(0.0, 0.0, 20.0)),
    );
    scan(&mut sensor, &world);
    assert_eq!(state_of(&sensor, 2), Some(PerceptionState::Began));
    assert_eq!(state_of(&sensor, 3), None);
    assert!(world.transform(PERCEIVER).is_some());
}

#[test]
fn scheduled_updates_respect_timer_and_automatic_flag() {
    let mut world = world_with_perceiver();
    place(&mut world, 2, 3.0);

    let mut sensor = SensorComponent::single(
        SensorConfiguration::new(SEEN, 10.0).with_update_interval(UpdateInterval::new(1.0, 0.0)),
    );
    let mut outbox = EventOutbox::new();
    let mut ctx = TickContext::new(0, 0.25, 7);

    let mut ran = Vec::new();
    for _ in 0..5 {
        let params = ProcessingParameters::scheduled(PERCEIVER, &world, &ctx);
        ran.push(sensor.update(&params, &mut outbox));
        ctx = ctx.next();
    }
    assert_eq!(ran, vec![true, false, false, false, true]);

    let manual = SensorFlags {
        automatic_update: false,
        ..SensorFlags::default()
    };
    let mut manual_sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0).with_flags(manual));
    let params = ProcessingParameters::scheduled(PERCEIVER, &world, &ctx);
    assert!(!manual_sensor.update(&params, &mut outbox));
    assert!(manual_sensor.update_for_event(PERCEIVER, &world, SEEN, &mut outbox));
}

#[test]
fn selective_update_only_touches_matching_sensors() {
    let mut world = world_with_perceiver();
    place(&mut world, 2, 3.0);
    let mut sensors = SensorComponent::multiple(vec![
        SensorConfiguration::new(StringHash::new("near"), 5.0),
        SensorConfiguration::new(StringHash::new("far"), 50.0),
    ]);
    let mut outbox = EventOutbox::new();

    assert!(sensors.update_for_event(PERCEIVER, &world, StringHash::new("far"), &mut outbox));
    assert_eq!(sensors.sensors()[0].perception_count(), 0);
    assert_eq!(sensors.sensors()[1].perception_count(), 1);
    assert_eq!(sensors.perception_count(), 1);
    assert!(sensors.may_have_events());
    assert!(!sensors.update_for_event(PERCEIVER, &world, StringHash::new("other"), &mut outbox));
}

#[test]
fn owner_without_transform_is_skipped() {
    let world = SandboxWorld::new();
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0));
    let mut outbox = EventOutbox::new();
    let params = ProcessingParameters::forced(PERCEIVER, &world);
    assert!(!sensor.update(&params, &mut outbox));
}

#[test]
fn state_roundtrips_through_snapshot() {
    let mut world = world_with_perceiver();
    place(&mut world, 2, 3.0);
    let mut sensor = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0));
    scan(&mut sensor, &world);

    let saved = sensor.save_state();
    let json = serde_json::to_string(&saved).expect("serialize");

    let mut restored = SensorComponent::single(SensorConfiguration::new(SEEN, 10.0));
    restored.load_state(serde_json::from_str(&json).expect("deserialize"));
    scan(&mut restored, &world);
    assert_eq!(state_of(&restored, 2), Some(PerceptionState::Continued));
}
