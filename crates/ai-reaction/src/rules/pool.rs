use serde::Deserialize;

use crate::rule::parse_properties;
use crate::standard::EventFilterProperties;
use crate::{
    EvaluationParameters, EventFilter, EventSource, ReactionError, ReactionPool, ReactionRegistry,
    ReactionRule, ReactionWorld, RuleEntry, RuleHeader, RuleProperties,
};

pub const DEFAULT_NUM_TRIES: u32 = 1;

/// Picks a random reaction from a pool whenever a matching event is present.
pub struct ReactionPoolRule<W: ReactionWorld> {
    header: RuleHeader,
    filter: EventFilter,
    pool: ReactionPool<W>,
    num_tries: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Properties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    num_tries: u32,
    probability_range: Option<f32>,
    reactions: Vec<RuleEntry>,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            filter: EventFilterProperties::default(),
            num_tries: DEFAULT_NUM_TRIES,
            probability_range: None,
            reactions: Vec::new(),
        }
    }
}

impl<W: ReactionWorld> ReactionPoolRule<W> {
    pub fn new(filter: EventFilter, pool: ReactionPool<W>) -> Self {
        Self {
            header: RuleHeader::new("ReactionPool"),
            filter,
            pool,
            num_tries: DEFAULT_NUM_TRIES,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    pub fn with_num_tries(mut self, num_tries: u32) -> Self {
        self.num_tries = num_tries;
        self
    }

    pub fn pool(&self) -> &ReactionPool<W> {
        &self.pool
    }
}

impl<W: ReactionWorld> Default for ReactionPoolRule<W> {
    fn default() -> Self {
        Self::new(EventFilter::default(), ReactionPool::new())
    }
}

impl<W: ReactionWorld> Clone for ReactionPoolRule<W> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            filter: self.filter,
            pool: self.pool.clone(),
            num_tries: self.num_tries,
        }
    }
}

impl<W: ReactionWorld> ReactionRule<W> for ReactionPoolRule<W> {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        let pool = &mut self.pool;
        let num_tries = self.num_tries;
        self.filter.handle_first(params, |params, event| {
            event.state.is_present() && pool.execute_reaction(params, Some(event), num_tries)
        })
    }

    fn reseed(&mut self, seed: u64) {
        self.pool.reseed(seed);
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: Properties = parse_properties(self.header.name(), properties)?;
        self.filter = props.filter.build(EventSource::Local);
        self.num_tries = props.num_tries.max(1);
        self.pool = ReactionPool::from_entries(&props.reactions, props.probability_range, registry);
        Ok(())
    }
}
