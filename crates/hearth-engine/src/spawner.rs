//! Demo population spawner.
//!
//! For every configured society the spawner lays out two anchors, a market
//! where trades happen only once both parties meet there and a well where
//! trading may happen on the way, then creates
//! `population.agents_per_society` agents around them. Each agent carries
//! every configured need at a random starting level, a random stock of the
//! one resource it produces, a daily trading window at its anchor and a few
//! random affinity ties to its neighbours.
//!
//! All draws come from one generator seeded with the world seed, so two
//! runs with the same configuration spawn the same world.

use hearth_agents::AgentSpec;
use hearth_core::{SimulationConfig, SimulationState};
use hearth_types::{AgentId, AnchorId, Need, NeedId, NeedSetting, ResourceId, SocietyId};
use hearth_world::{ActivityWindow, FixedSchedule, Position, StepNavigator};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Layout constants
// -----------------------------------------------------------------------

/// Distance between neighbouring societies' markets.
const SOCIETY_SPACING: f32 = 60.0;

/// Offset of a society's well from its market.
const WELL_OFFSET: f32 = 12.0;

/// Agents start within this distance of their society's market.
const SCATTER_RADIUS: f32 = 10.0;

/// Starting need levels are drawn below this value.
const MAX_STARTING_NEED: f32 = 0.7;

/// Need setting shared by every demo need.
const INTENT_THRESHOLD: f32 = 0.6;
const REQUEST_AMOUNT: f32 = 1.0;
const SATISFACTION_PER_UNIT: f32 = 0.5;

/// Hours each agent's daily trading window stays open.
const WINDOW_HOURS: f64 = 8.0;

/// Chance that two agents of one society start with an affinity tie.
const TIE_PROBABILITY: f64 = 0.3;

/// Mixed into the world seed so the spawner does not share a stream with
/// any agent.
const SPAWN_SALT: u64 = 0x5EED_F00D_4EA7;

/// Built-in pool of agent names. The spawner picks randomly without
/// replacement from this list to ensure uniqueness.
const NAME_POOL: &[&str] = &[
    "Alder", "Birch", "Cedar", "Dusk", "Ember", "Fern", "Grove", "Haze",
    "Iris", "Juniper", "Kestrel", "Lark", "Moss", "Nettle", "Oak", "Pine",
    "Quill", "Reed", "Sage", "Thorn", "Umber", "Vale", "Wren", "Yarrow",
    "Zephyr", "Ash", "Brook", "Clay", "Dawn", "Elm", "Flint", "Gale",
    "Heath", "Ivy", "Jay", "Kale", "Lichen", "Maple", "Nyx", "Onyx",
    "Pebble", "Quartz", "Raven", "Sable", "Terra", "Urchin", "Vole",
    "Willow", "Xylem", "Yew",
];

// -----------------------------------------------------------------------
// Spawning result
// -----------------------------------------------------------------------

/// What the spawner created.
#[derive(Debug, Default)]
pub struct SpawnResult {
    /// Spawned agents in creation order.
    pub agents: Vec<AgentId>,
    /// Registered anchors in creation order.
    pub anchors: Vec<AnchorId>,
}

/// Collaborators the spawner places agents into.
pub struct SpawnTargets<'a> {
    /// Simulation state receiving anchors and agents.
    pub state: &'a mut SimulationState,
    /// Navigator receiving starting positions.
    pub navigator: &'a mut StepNavigator,
    /// Schedule receiving daily trading windows.
    pub schedule: &'a mut FixedSchedule,
}

/// The two anchors of one society.
#[derive(Debug, Clone, Copy)]
struct SocietySite {
    market: AnchorId,
    well: AnchorId,
    origin: Position,
}

// -----------------------------------------------------------------------
// Population spawn
// -----------------------------------------------------------------------

/// Spawn the demo population for every society already registered in
/// `targets.state`.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if the name pool is too small or no
/// needs are configured, and propagates anchor, agent and schedule
/// registration failures.
pub fn spawn_population(
    config: &SimulationConfig,
    targets: &mut SpawnTargets<'_>,
) -> Result<SpawnResult, EngineError> {
    let needs: Vec<(NeedId, ResourceId)> = config
        .population
        .needs
        .iter()
        .map(|(need, resource)| (NeedId::from(need.as_str()), ResourceId::from(resource.as_str())))
        .collect();
    if needs.is_empty() {
        return Err(EngineError::Spawner {
            message: String::from("population.needs is empty"),
        });
    }

    let societies: Vec<(SocietyId, String)> = targets
        .state
        .societies
        .iter()
        .map(|s| (s.id, s.name.clone()))
        .collect();
    let per_society = usize::try_from(config.population.agents_per_society).map_err(|_err| {
        EngineError::Spawner {
            message: String::from("agents_per_society exceeds usize range"),
        }
    })?;
    let total = societies.len().saturating_mul(per_society);

    let mut rng = SmallRng::seed_from_u64(config.world.seed ^ SPAWN_SALT);
    let mut names = pick_unique_names(&mut rng, total)?.into_iter();
    let max_stock = config.population.max_starting_stock.max(0.0);
    let mut result = SpawnResult::default();

    for (index, (society, society_name)) in societies.iter().enumerate() {
        let site = lay_out_site(targets.state, society_name, index)?;
        result.anchors.extend([site.market, site.well]);

        let mut members = Vec::with_capacity(per_society);
        for slot in 0..per_society {
            let Some(name) = names.next() else {
                break;
            };
            let produces = needs
                .get(slot.checked_rem(needs.len()).unwrap_or(0))
                .map(|(_, resource)| resource.clone())
                .unwrap_or_default();
            let anchor = if slot.checked_rem(2) == Some(0) { site.market } else { site.well };
            let spec = AgentSpec {
                needs: needs
                    .iter()
                    .map(|(need, _)| {
                        Need::new(need.clone(), rng.random::<f32>() * MAX_STARTING_NEED, 0.0, 1.0)
                    })
                    .collect(),
                settings: needs
                    .iter()
                    .map(|(need, resource)| need_setting(need, resource))
                    .collect(),
                resources: vec![(produces.clone(), rng.random::<f32>() * max_stock)],
                trade_anchor: Some(anchor),
                ..AgentSpec::new(name, "villager", *society)
            };
            let id = targets.state.spawn_agent(spec)?;

            targets.navigator.place(id, scatter(&mut rng, site.origin));
            let start_hour = f64::from(rng.random_range(6_u8..10));
            targets.schedule.add_window(
                id,
                ActivityWindow {
                    start_hour,
                    end_hour: start_hour + WINDOW_HOURS,
                    anchor: Some(anchor),
                    trade_capable: true,
                },
            )?;
            debug!(agent = %id, society = %society, produces = %produces, "Spawned demo agent");
            members.push(id);
        }

        tie_neighbours(targets.state, &members, &mut rng);
        info!(
            society = %society,
            name = %society_name,
            agents = members.len(),
            "Society populated"
        );
        result.agents.extend(members);
    }

    Ok(result)
}

/// Register the market and well of the `index`-th society.
fn lay_out_site(
    state: &mut SimulationState,
    society_name: &str,
    index: usize,
) -> Result<SocietySite, EngineError> {
    let x = u16::try_from(index).map_or(f32::from(u16::MAX), f32::from) * SOCIETY_SPACING;
    let origin = Position::new(x, 0.0);
    let market = state.add_anchor(&format!("{society_name} market"), origin, Vec::new(), false)?;
    let well = state.add_anchor(
        &format!("{society_name} well"),
        Position::new(x, WELL_OFFSET),
        Vec::new(),
        true,
    )?;
    Ok(SocietySite {
        market,
        well,
        origin,
    })
}

fn need_setting(need: &NeedId, resource: &ResourceId) -> NeedSetting {
    NeedSetting {
        need_id: need.clone(),
        resource_id: resource.clone(),
        min: 0.0,
        max: 1.0,
        satisfaction_per_unit: SATISFACTION_PER_UNIT,
        request_amount: REQUEST_AMOUNT,
        intent_threshold: INTENT_THRESHOLD,
    }
}

/// A random point within [`SCATTER_RADIUS`] of `origin` on both axes.
fn scatter(rng: &mut impl Rng, origin: Position) -> Position {
    Position::new(
        origin.x + rng.random_range(-SCATTER_RADIUS..SCATTER_RADIUS),
        origin.y + rng.random_range(-SCATTER_RADIUS..SCATTER_RADIUS),
    )
}

/// Give random pairs of `members` a one-way affinity tie.
fn tie_neighbours(state: &mut SimulationState, members: &[AgentId], rng: &mut impl Rng) {
    for &from in members {
        for &to in members {
            if from == to || !rng.random_bool(TIE_PROBABILITY) {
                continue;
            }
            let score = rng.random_range(-0.5_f32..=0.8);
            if let Some(agent) = state.agents.get_mut(from) {
                agent.affinity.set(to, score);
            }
        }
    }
}

/// Pick `count` unique names from the name pool using random sampling.
fn pick_unique_names<R: Rng>(rng: &mut R, count: usize) -> Result<Vec<String>, EngineError> {
    let pool_len = NAME_POOL.len();
    if count > pool_len {
        return Err(EngineError::Spawner {
            message: format!("requested {count} names but pool only has {pool_len}"),
        });
    }

    let mut available: Vec<&str> = NAME_POOL.to_vec();
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        let idx = rng.random_range(0..available.len());
        if idx < available.len() {
            names.push(String::from(available.swap_remove(idx)));
        }
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use hearth_world::{Navigation, Schedule};

    use super::*;

    struct World {
        state: SimulationState,
        navigator: StepNavigator,
        schedule: FixedSchedule,
    }

    fn spawn(config: &SimulationConfig) -> (World, Result<SpawnResult, EngineError>) {
        let mut world = World {
            state: SimulationState::from_config(config).unwrap(),
            navigator: StepNavigator::new(4.0, 0.5),
            schedule: FixedSchedule::new(),
        };
        let result = spawn_population(
            config,
            &mut SpawnTargets {
                state: &mut world.state,
                navigator: &mut world.navigator,
                schedule: &mut world.schedule,
            },
        );
        (world, result)
    }

    #[test]
    fn spawns_every_society() {
        let config = SimulationConfig::default();
        let (world, result) = spawn(&config);
        let result = result.unwrap();

        let per_society = usize::try_from(config.population.agents_per_society).unwrap();
        assert_eq!(result.agents.len(), config.societies.len() * per_society);
        assert_eq!(result.anchors.len(), config.societies.len() * 2);
        assert_eq!(world.state.agents.len(), result.agents.len());
    }

    #[test]
    fn all_unique_names() {
        let (world, result) = spawn(&SimulationConfig::default());
        result.unwrap();
        let names: BTreeSet<&str> = world.state.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names.len(), world.state.agents.len());
    }

    #[test]
    fn agents_carry_needs_stock_and_a_window() {
        let config = SimulationConfig::default();
        let (world, result) = spawn(&config);
        for id in result.unwrap().agents {
            let agent = world.state.agents.get(id).unwrap();
            assert_eq!(agent.needs.len(), config.population.needs.len());
            assert!(agent.needs.iter().all(|n| n.value < MAX_STARTING_NEED));
            assert!(agent.trade_anchor.is_some());
            assert!(world.navigator.position(id).is_some());
            // Every window opens between 06:00 and 10:00 and lasts 8 hours.
            assert!(world.schedule.is_trade_capable_now(id, 10.5));
        }
    }

    #[test]
    fn same_seed_spawns_the_same_world() {
        let config = SimulationConfig::default();
        let (first, a) = spawn(&config);
        let (second, b) = spawn(&config);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.agents, b.agents);
        for id in a.agents {
            assert_eq!(
                first.state.agents.get(id).unwrap().name,
                second.state.agents.get(id).unwrap().name
            );
            assert_eq!(first.navigator.position(id), second.navigator.position(id));
        }
    }

    #[test]
    fn too_many_agents_returns_error() {
        let mut config = SimulationConfig::default();
        config.population.agents_per_society = 100;
        let (_, result) = spawn(&config);
        assert!(matches!(result, Err(EngineError::Spawner { .. })));
    }

    #[test]
    fn empty_needs_returns_error() {
        let mut config = SimulationConfig::default();
        config.population.needs.clear();
        let (_, result) = spawn(&config);
        assert!(matches!(result, Err(EngineError::Spawner { .. })));
    }

    #[test]
    fn zero_agents_returns_only_anchors() {
        let mut config = SimulationConfig::default();
        config.population.agents_per_society = 0;
        let (world, result) = spawn(&config);
        let result = result.unwrap();
        assert!(result.agents.is_empty());
        assert!(world.state.agents.is_empty());
        assert_eq!(result.anchors.len(), config.societies.len() * 2);
    }
}
