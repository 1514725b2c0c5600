//! Agent simulation on top of the chunked world.
//!
//! # Module Structure
//!
//! - `needs`: hunger, thirst and energy with decay and clamping
//! - `memory`: per-agent record of observed chunks and resource tiles
//! - `pathfinding`: bounded A* with line-of-sight path compaction
//! - `tasks`: prioritised, interruptible, linked tasks and the task queue
//! - `actions`: what each task does per tick
//! - `agent`: decision logic, steering and the per-agent update
//! - `inventory`: carried items
//! - `fauna`: animals, food and the spawn pass
//! - `simulation`: the fixed-step tick loop

pub mod actions;
pub mod agent;
pub mod fauna;
pub mod inventory;
pub mod memory;
pub mod needs;
pub mod pathfinding;
pub mod simulation;
pub mod tasks;

pub use actions::{Action, ActionContext, ActionStatus};
pub use agent::{Agent, AgentSnapshot, Steering};
pub use fauna::{spawn_pass, Animal, Food, FoodKind, SpawnReport};
pub use inventory::{Inventory, Item};
pub use memory::{ResourceSite, SpatialMemory};
pub use needs::{Need, Needs};
pub use pathfinding::{a_star, GridPath, PathOutcome, Pathfinder};
pub use simulation::{Simulation, SimulationStats};
pub use tasks::{create_linked_tasks, StepReport, Task, TaskQueue, TaskState};
