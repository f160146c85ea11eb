#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Defence combat engine.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the pure combat systems and the simulation loop. Player intent arrives as
//! [`Command`] values, every observable state change leaves as an [`Event`],
//! and static content is described by the value types in [`definitions`]
//! which collaborators supply through [`ConfigProvider`].

mod contracts;
mod damage;
pub mod definitions;
mod geometry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use contracts::{
    ConfigProvider, EconomySink, EventSink, MetaUpgradeProvider, MetaUpgradeTiers, NoContent,
};
pub use damage::{resolve_damage, ResistProfile, MAX_RESISTANCE};
pub use definitions::{
    BarracksProfile, DeathBurst, EnemyDefinition, ProjectileProfile, SpawnEntry,
    StageDefinition, TowerDefinition, TowerLevelDefinition, WaveDefinition,
};
pub use geometry::WorldPoint;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

identifier!(
    /// Unique identifier assigned to each spawned enemy.
    EnemyId
);
identifier!(
    /// Unique identifier assigned to each placed tower.
    TowerId
);
identifier!(
    /// Unique identifier assigned to each barracks soldier.
    SoldierId
);
identifier!(
    /// Unique identifier assigned to each in-flight projectile.
    ProjectileId
);
identifier!(
    /// Index of a build slot on the battlefield.
    SlotIndex
);
identifier!(
    /// Identifier of a waypoint path.
    PathId
);
identifier!(
    /// Identifier of a stage.
    StageId
);

/// Type of damage carried by an attack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Reduced by armour.
    #[default]
    Physical,
    /// Reduced by magic resistance.
    Magic,
    /// Ignores every resistance.
    True,
}

/// Archetype of a tower.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TowerType {
    /// Fast single-target physical damage.
    #[default]
    Archer,
    /// Melee squad that blocks enemies.
    Barracks,
    /// Magic damage that pierces armour.
    Mage,
    /// Slow area damage aimed at a point.
    Artillery,
}

impl TowerType {
    /// Every tower type in declaration order.
    pub const ALL: [TowerType; 4] = [
        TowerType::Archer,
        TowerType::Barracks,
        TowerType::Mage,
        TowerType::Artillery,
    ];
}

/// How an attack travels from a tower to its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// Launches a projectile that must travel to the target.
    #[default]
    Projectile,
    /// Damage lands instantly.
    HitScan,
    /// Delivered by squad members.
    Melee,
}

/// Which enemies a tower is allowed to attack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Ground enemies only.
    #[default]
    Ground,
    /// Flying enemies only.
    Air,
    /// Any enemy.
    Both,
}

impl TargetType {
    /// Reports whether an enemy with the given flying flag is eligible.
    #[must_use]
    pub const fn allows(self, flying: bool) -> bool {
        match self {
            TargetType::Ground => !flying,
            TargetType::Air => flying,
            TargetType::Both => true,
        }
    }
}

/// Trajectory family of a projectile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileMoveType {
    /// Straight flight.
    Linear,
    /// Follows its target.
    #[default]
    Homing,
    /// Lobbed arc towards a point.
    Ballistic,
}

/// Phases of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    /// The flow has not been started.
    #[default]
    Idle,
    /// Short set-up period before the first wave is announced.
    Prepare,
    /// Countdown before the current wave starts spawning.
    WaveReady,
    /// The current wave is spawning or still has living enemies.
    WaveRunning,
    /// Rest period after a wave is cleared.
    WaveBreak,
    /// The match is over.
    Result,
    /// Overlay that freezes the underlying phase.
    Pause,
}

/// Motion state of an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyMotion {
    /// Walking its path.
    Moving,
    /// Held by a blocker and settling into place.
    Blocked,
    /// Held by a blocker and attacking it.
    Attacking,
    /// Killed.
    Dead,
}

/// Lifecycle state of a barracks soldier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoldierState {
    /// Standing at its post.
    Idle,
    /// Walking to its post or its assigned enemy.
    Moving,
    /// Holding an enemy in place.
    Blocking,
    /// Fallen, waiting to begin its respawn.
    Dead,
    /// Counting down to its return.
    Respawning,
}

/// Tier-three abilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerSkill {
    /// Archer shot that kills outright or deals heavy true damage.
    Headshot,
    /// Mage bolt that kills outright or deals heavy magic damage.
    Disintegrate,
    /// Artillery splash on every enemy near the primary target.
    ClusterBlast,
    /// Barracks throw at the nearest unblocked enemy.
    ThrowingAxe,
}

/// Where a projectile is headed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProjectileTarget {
    /// Follows a live enemy.
    Enemy(EnemyId),
    /// Flies to a fixed point and explodes.
    Point(WorldPoint),
}

/// Request emitted by a tower to launch a projectile.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileRequest {
    /// Tower that fired.
    pub tower: TowerId,
    /// Launch position.
    pub origin: WorldPoint,
    /// Destination.
    pub target: ProjectileTarget,
    /// Base damage before resistances.
    pub damage: f32,
    /// Damage type of the hit.
    pub damage_type: DamageType,
    /// Halves armour on physical hits.
    pub half_penetration: bool,
    /// Whether the projectile may strike flying enemies.
    pub can_hit_air: bool,
    /// Radius searched when re-acquiring a target.
    pub reacquire_range: f32,
    /// Flight profile to use.
    pub profile_id: String,
    /// Permits one re-acquisition if the target dies mid-flight.
    pub allow_single_retarget: bool,
}

/// Immutable representation of a single enemy used for targeting queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Current position.
    pub position: WorldPoint,
    /// Remaining health.
    pub health: f32,
    /// Current motion state.
    pub motion: EnemyMotion,
    /// Whether the enemy flies.
    pub flying: bool,
    /// Whether the enemy is a boss.
    pub boss: bool,
    /// Whether the enemy may be blocked at all.
    pub blockable: bool,
    /// Tower currently holding the enemy, if any.
    pub blocked_by: Option<TowerId>,
}

impl EnemySnapshot {
    /// Reports whether the snapshot describes a living enemy.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.motion != EnemyMotion::Dead
    }
}

/// Read-only snapshot of every enemy, ordered by identifier.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Player intent accepted by the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Builds a tower at a specific slot, or at the first free slot.
    BuildTower {
        /// Type of tower to build.
        tower_type: TowerType,
        /// Requested slot. `None` selects the first free slot.
        slot: Option<SlotIndex>,
    },
    /// Upgrades a tower by one level.
    UpgradeTower {
        /// Tower to upgrade.
        tower: TowerId,
    },
    /// Sells a tower for a partial refund.
    SellTower {
        /// Tower to sell.
        tower: TowerId,
    },
    /// Moves a barracks rally point.
    SetRallyPoint {
        /// Barracks to update.
        tower: TowerId,
        /// Requested rally point; clamped to the rally range.
        point: WorldPoint,
    },
    /// Skips the remaining countdown and starts the next wave.
    EarlyCallNextWave,
    /// Freezes the match.
    Pause,
    /// Unfreezes the match.
    Resume,
}

/// Events broadcast by the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The match moved to a new phase.
    FlowStateChanged {
        /// Phase before the transition.
        from: FlowState,
        /// Phase after the transition.
        to: FlowState,
        /// One-based wave counter at the time of the transition.
        wave: u32,
    },
    /// The wave counter changed.
    WaveChanged {
        /// New one-based wave counter.
        wave: u32,
        /// Total number of waves in the stage.
        total: u32,
    },
    /// A wave began spawning.
    WaveStarted {
        /// One-based wave number.
        wave: u32,
        /// Number of enemies the wave will spawn.
        enemies: u32,
    },
    /// A wave finished spawning its last enemy.
    WaveSpawnCompleted {
        /// One-based wave number.
        wave: u32,
    },
    /// Every enemy of the current wave has been dealt with.
    WaveCleared {
        /// One-based wave number.
        wave: u32,
    },
    /// The player called a wave early.
    EarlyCalled {
        /// Wave that was started.
        wave: u32,
        /// Gold awarded for the call.
        reward: u32,
    },
    /// An enemy entered the battlefield.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Definition the enemy was created from.
        definition: String,
        /// Path the enemy follows.
        path: PathId,
        /// Spawn position.
        position: WorldPoint,
    },
    /// A blocker took hold of an enemy.
    EnemyBlocked {
        /// Enemy that was stopped.
        enemy: EnemyId,
        /// Tower whose soldier holds it.
        tower: TowerId,
    },
    /// A blocker let go of an enemy.
    EnemyReleased {
        /// Enemy that may move again.
        enemy: EnemyId,
        /// Tower that released it.
        tower: TowerId,
    },
    /// An enemy died.
    EnemyKilled {
        /// Enemy that died.
        enemy: EnemyId,
        /// Gold awarded for the kill.
        bounty: u32,
        /// Position of death.
        position: WorldPoint,
        /// Burst released on death, if any.
        death_burst: Option<DeathBurst>,
    },
    /// An enemy walked off the end of its path.
    EnemyReachedGoal {
        /// Enemy that escaped.
        enemy: EnemyId,
        /// Lives it removes.
        damage_to_base: u32,
    },
    /// A tower was built.
    TowerBuilt {
        /// Identifier assigned to the tower.
        tower: TowerId,
        /// Type of the tower.
        tower_type: TowerType,
        /// Slot the tower occupies.
        slot: SlotIndex,
        /// Gold spent.
        cost: u32,
    },
    /// A tower gained a level.
    TowerUpgraded {
        /// Tower that was upgraded.
        tower: TowerId,
        /// New one-based level.
        level: u32,
        /// Gold spent.
        cost: u32,
    },
    /// A tower was sold.
    TowerSold {
        /// Tower that was removed.
        tower: TowerId,
        /// Slot that became free.
        slot: SlotIndex,
        /// Gold refunded.
        refund: u32,
    },
    /// A barracks rally point moved.
    RallyPointMoved {
        /// Barracks that was updated.
        tower: TowerId,
        /// Rally point after clamping.
        point: WorldPoint,
    },
    /// A tower attacked an enemy.
    TowerAttacked {
        /// Attacking tower.
        tower: TowerId,
        /// Primary target.
        enemy: EnemyId,
        /// How the attack was delivered.
        delivery: DeliveryType,
    },
    /// A tier-three skill fired.
    SkillTriggered {
        /// Tower that used the skill.
        tower: TowerId,
        /// Skill that fired.
        skill: TowerSkill,
        /// Primary target.
        enemy: EnemyId,
        /// Whether the target was killed outright.
        instant_kill: bool,
    },
    /// A projectile was launched.
    ProjectileLaunched {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Tower that fired it.
        tower: TowerId,
    },
    /// A soldier fell.
    SoldierDied {
        /// Soldier that fell.
        soldier: SoldierId,
        /// Owning barracks.
        tower: TowerId,
    },
    /// A soldier returned to its rally point.
    SoldierRespawned {
        /// Soldier that returned.
        soldier: SoldierId,
        /// Owning barracks.
        tower: TowerId,
    },
    /// The last life was lost.
    LivesDepleted,
    /// A command could not be carried out.
    CommandRejected {
        /// Reason for the rejection.
        reason: CommandError,
    },
}

/// Reasons a build request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum BuildError {
    /// Every build slot is occupied.
    #[error("no free build slot")]
    NoFreeSlot,
    /// The requested slot does not exist or is occupied.
    #[error("slot {0:?} is not available")]
    SlotUnavailable(SlotIndex),
    /// The player cannot afford the tower.
    #[error("insufficient gold: {required} required, {available} available")]
    InsufficientGold {
        /// Build cost.
        required: u32,
        /// Gold on hand.
        available: u32,
    },
}

/// Reasons an upgrade request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("tower {0:?} does not exist")]
    MissingTower(TowerId),
    /// The tower is already at its last level.
    #[error("tower is already at its maximum level")]
    MaxLevel,
    /// The player cannot afford the upgrade.
    #[error("insufficient gold: {required} required, {available} available")]
    InsufficientGold {
        /// Upgrade cost.
        required: u32,
        /// Gold on hand.
        available: u32,
    },
}

/// Reasons a sell request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum SellError {
    /// No tower with the provided identifier exists.
    #[error("tower {0:?} does not exist")]
    MissingTower(TowerId),
}

/// Reasons a rally point request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum RallyError {
    /// No tower with the provided identifier exists.
    #[error("tower {0:?} does not exist")]
    MissingTower(TowerId),
    /// Only barracks have rally points.
    #[error("tower {0:?} is not a barracks")]
    NotBarracks(TowerId),
}

/// Reasons any command may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum CommandError {
    /// Build rejected.
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Upgrade rejected.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
    /// Sell rejected.
    #[error(transparent)]
    Sell(#[from] SellError),
    /// Rally point rejected.
    #[error(transparent)]
    Rally(#[from] RallyError),
    /// No wave can be called in the current phase.
    #[error("early call is not available in {0:?}")]
    EarlyCallUnavailable(FlowState),
    /// Pausing or resuming is not possible in the current phase.
    #[error("pause state cannot change in {0:?}")]
    PauseUnavailable(FlowState),
}
