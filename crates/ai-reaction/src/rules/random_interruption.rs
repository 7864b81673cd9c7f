use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::rule::{parse_properties, parse_state};
use crate::{
    ActionTemplate, EvaluationParameters, ReactionError, ReactionRegistry, ReactionRule,
    ReactionWorld, RuleHeader, RuleProperties,
};

pub const DEFAULT_IMPULSE_IN: f32 = 10.0;
pub const DEFAULT_NO_IMPULSE_FOR: f32 = 5.0;

/// Fires a self-targeted action at random moments.
///
/// The next impulse is scheduled on the game clock: a uniform delay in `[0, ImpulsIn)`,
/// plus a `NoImpulsFor` cooldown after each impulse.
#[derive(Debug, Clone)]
pub struct RandomInterruption {
    header: RuleHeader,
    impulse_in: f32,
    no_impulse_for: f32,
    action: ActionTemplate,
    next_impulse: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Properties {
    #[serde(rename = "ImpulsIn")]
    impulse_in: f32,
    #[serde(rename = "NoImpulsFor")]
    no_impulse_for: f32,
    #[serde(flatten)]
    action: ActionTemplate,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            impulse_in: DEFAULT_IMPULSE_IN,
            no_impulse_for: DEFAULT_NO_IMPULSE_FOR,
            action: ActionTemplate::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ImpulseMemory {
    next_impulse: Option<f64>,
}

impl RandomInterruption {
    pub fn new(impulse_in: f32, no_impulse_for: f32, action: ActionTemplate) -> Self {
        Self {
            header: RuleHeader::new("RandomInteruption"),
            impulse_in,
            no_impulse_for,
            action,
            next_impulse: None,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    /// Game time of the next impulse, once scheduled.
    pub fn next_impulse(&self) -> Option<f64> {
        self.next_impulse
    }
}

impl Default for RandomInterruption {
    fn default() -> Self {
        Self::new(DEFAULT_IMPULSE_IN, DEFAULT_NO_IMPULSE_FOR, ActionTemplate::default())
    }
}

impl<W: ReactionWorld> ReactionRule<W> for RandomInterruption {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        let now = params.time();
        let next = match self.next_impulse {
            Some(next) => next,
            None => {
                let next = now + f64::from(params.random_range(0.0, self.impulse_in));
                self.next_impulse = Some(next);
                next
            }
        };
        if now < next {
            return false;
        }

        let request = self.action.build(params.entity, self.header.priority, &mut *params.rng);
        if !params.push_action(request) {
            return false;
        }
        let delay = self.no_impulse_for + params.random_range(0.0, self.impulse_in);
        self.next_impulse = Some(now + f64::from(delay));
        debug!(entity = ?params.entity, next = now + f64::from(delay), "random impulse");
        true
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: Properties = parse_properties(self.header.name(), properties)?;
        let invalid = |reason: String| ReactionError::InvalidProperties {
            name: self.header.name().to_owned(),
            reason,
        };
        props.action.validate().map_err(invalid)?;
        if !(props.impulse_in >= 0.0 && props.no_impulse_for >= 0.0) {
            return Err(invalid(format!(
                "ImpulsIn and NoImpulsFor must be >= 0 (got {} and {})",
                props.impulse_in, props.no_impulse_for
            )));
        }
        self.impulse_in = props.impulse_in;
        self.no_impulse_for = props.no_impulse_for;
        self.action = props.action;
        Ok(())
    }

    fn save_state(&self) -> Value {
        serde_json::to_value(ImpulseMemory {
            next_impulse: self.next_impulse,
        })
        .unwrap_or(Value::Null)
    }

    fn load_state(&mut self, state: Value) -> Result<(), ReactionError> {
        let memory: ImpulseMemory = parse_state(self.header.name(), state)?;
        self.next_impulse = memory.next_impulse;
        Ok(())
    }
}
