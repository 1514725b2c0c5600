//! Prioritised, interruptible, linked tasks.
//!
//! A task moves Pending -> Executing -> Completed, with two side exits:
//! Interrupted (not enough energy this tick; the task stays at the head and
//! resumes unchanged later) and Cancelled (dropped together with its linked
//! follow-ups). The queue keeps tasks sorted by descending priority, stable
//! among equals; its head is the current task.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::simulation::actions::{Action, ActionContext, ActionStatus};
use crate::simulation::agent::Agent;
use crate::simulation::needs::Need;
use crate::world::{EntityId, TilePos, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Executing,
    Completed,
    Interrupted,
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct Task {
    pub name: String,
    pub action: Action,
    /// Higher runs first
    pub priority: i32,
    /// Energy spent per simulated second while executing
    pub energy_cost: f32,
    pub state: TaskState,
    pub interrupted: bool,
    /// Need this task is meant to relieve, if any
    pub need: Option<Need>,
    /// Destination tile claimed for this task
    pub reservation: Option<TilePos>,
    /// Follow-ups, promoted in order as each completes
    pub linked: Vec<Task>,
    /// Consecutive ticks without progress
    pub stalls: u32,
}

impl Task {
    pub fn new(name: impl Into<String>, action: Action, priority: i32) -> Self {
        Task {
            name: name.into(),
            action,
            priority,
            energy_cost: 0.0,
            state: TaskState::Pending,
            interrupted: false,
            need: None,
            reservation: None,
            linked: Vec::new(),
            stalls: 0,
        }
    }

    pub fn with_energy_cost(mut self, cost: f32) -> Self {
        self.energy_cost = cost.max(0.0);
        self
    }

    pub fn for_need(mut self, need: Need) -> Self {
        self.need = Some(need);
        self
    }

    pub fn with_reservation(mut self, tile: TilePos) -> Self {
        self.reservation = Some(tile);
        self
    }

    pub fn complete(&mut self) {
        self.state = TaskState::Completed;
    }

    pub fn interrupt(&mut self) {
        self.state = TaskState::Interrupted;
        self.interrupted = true;
    }

    /// Whether this task or any follow-up targets `need`.
    pub fn addresses(&self, need: Need) -> bool {
        self.need == Some(need) || self.linked.iter().any(|t| t.addresses(need))
    }

    fn release_reservations(&self, world: &mut World, id: EntityId) {
        if let Some(tile) = self.reservation {
            world.release_destination(tile, id);
        }
        for task in &self.linked {
            task.release_reservations(world, id);
        }
    }
}

/// Chain `tasks` so completing each promotes the next. Returns the head.
pub fn create_linked_tasks(tasks: Vec<Task>) -> Option<Task> {
    let mut next: Option<Task> = None;
    for mut task in tasks.into_iter().rev() {
        if let Some(follow_up) = next.take() {
            task.linked.push(follow_up);
        }
        next = Some(task);
    }
    next
}

/// What happened on one execution step.
#[derive(Clone, Debug, PartialEq)]
pub enum StepReport {
    /// Nothing queued
    Idle,
    Running(String),
    Interrupted(String),
    Completed(String),
    Cancelled(String),
}

#[derive(Clone, Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert by descending priority, after existing tasks of equal priority.
    /// A task that lands ahead of the current one pauses it.
    pub fn add(&mut self, task: Task) {
        let index = self
            .tasks
            .iter()
            .position(|t| t.priority < task.priority)
            .unwrap_or(self.tasks.len());
        if index == 0 {
            if let Some(current) = self.tasks.front_mut() {
                if current.state == TaskState::Executing {
                    current.state = TaskState::Pending;
                }
            }
        }
        trace!(task = %task.name, priority = task.priority, index, "task queued");
        self.tasks.insert(index, task);
    }

    /// Link `tasks` into one chain and queue its head.
    pub fn add_linked(&mut self, tasks: Vec<Task>) {
        if let Some(head) = create_linked_tasks(tasks) {
            self.add(head);
        }
    }

    pub fn current(&self) -> Option<&Task> {
        self.tasks.front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Queued task names, head first.
    pub fn names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }

    /// Whether a queued task (or a follow-up) already targets `need`.
    pub fn addresses(&self, need: Need) -> bool {
        self.tasks.iter().any(|t| t.addresses(need))
    }

    /// Drop the current task and its follow-ups, releasing their tiles.
    pub fn cancel_current(&mut self, world: &mut World, id: EntityId) -> Option<Task> {
        let mut task = self.tasks.pop_front()?;
        task.state = TaskState::Cancelled;
        task.release_reservations(world, id);
        debug!(%id, task = %task.name, "task cancelled");
        Some(task)
    }

    /// Cancel everything.
    pub fn clear(&mut self, world: &mut World, id: EntityId) {
        while self.cancel_current(world, id).is_some() {}
    }

    /// Run one step of the current task.
    ///
    /// Energy is checked before the action runs: if the agent cannot pay
    /// `energy_cost * dt` the task is interrupted and left at the head with
    /// nothing deducted.
    pub fn execute(&mut self, agent: &mut Agent, world: &mut World, ctx: &ActionContext, dt: f32) -> StepReport {
        let Some(task) = self.tasks.front_mut() else {
            return StepReport::Idle;
        };

        let cost = task.energy_cost * dt;
        if !agent.needs.try_spend_energy(cost) {
            if task.state != TaskState::Interrupted {
                debug!(agent = %agent.name, task = %task.name, "task interrupted, not enough energy");
            }
            task.interrupt();
            return StepReport::Interrupted(task.name.clone());
        }
        if task.state != TaskState::Executing {
            trace!(agent = %agent.name, task = %task.name, "task started");
        }
        task.state = TaskState::Executing;

        match task.action.run(agent, world, ctx, dt) {
            ActionStatus::Running => {
                task.stalls = 0;
                StepReport::Running(task.name.clone())
            }
            ActionStatus::Completed => {
                task.complete();
                self.finish_current(world, ctx.id)
            }
            ActionStatus::Stalled => {
                task.stalls += 1;
                if task.stalls >= ctx.agent.task_stall_limit {
                    let name = task.name.clone();
                    self.cancel_current(world, ctx.id);
                    StepReport::Cancelled(name)
                } else {
                    StepReport::Running(task.name.clone())
                }
            }
            ActionStatus::Failed => {
                let name = task.name.clone();
                self.cancel_current(world, ctx.id);
                StepReport::Cancelled(name)
            }
        }
    }

    /// Pop a completed head and promote its first follow-up to the front.
    fn finish_current(&mut self, world: &mut World, id: EntityId) -> StepReport {
        let Some(mut done) = self.tasks.pop_front() else {
            return StepReport::Idle;
        };
        let name = std::mem::take(&mut done.name);
        debug!(%id, task = %name, "task completed");

        let mut follow_ups = std::mem::take(&mut done.linked).into_iter();
        let next = follow_ups.next().map(|mut next| {
            next.linked.extend(follow_ups);
            next
        });

        // Keep a tile claimed if the follow-up still needs it
        if let Some(tile) = done.reservation {
            if next.as_ref().and_then(|n| n.reservation) != Some(tile) {
                world.release_destination(tile, id);
            }
        }
        if let Some(next) = next {
            self.tasks.push_front(next);
        }
        StepReport::Completed(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::{Biome, BiomeBand};
    use crate::config::SimConfig;
    use crate::world::Position;

    fn setup() -> (World, Agent, SimConfig) {
        let mut config = SimConfig::with_seed(11);
        config.world.chunk_size = 8;
        config.world.biomes = vec![BiomeBand::new(Biome::Plains, -1.0, 1.01)];
        let world = World::new(config.clone()).unwrap();
        let agent = Agent::new("Tester", Position::new(0.5, 0.5), &config.agent, 1);
        (world, agent, config)
    }

    fn rest(name: &str, priority: i32) -> Task {
        Task::new(name, Action::Rest, priority)
    }

    #[test]
    fn test_priority_order_is_stable() {
        let mut queue = TaskQueue::new();
        queue.add(rest("a10", 10));
        queue.add(rest("b50", 50));
        queue.add(rest("c50", 50));
        queue.add(rest("d5", 5));
        assert_eq!(queue.names(), vec!["b50", "c50", "a10", "d5"]);
    }

    #[test]
    fn test_execution_follows_priority() {
        let (mut world, mut agent, config) = setup();
        let ctx = ActionContext::new(EntityId(1), &config);
        let mut queue = TaskQueue::new();
        for (name, priority) in [("a10", 10), ("b50", 50), ("c50", 50), ("d5", 5)] {
            queue.add(rest(name, priority));
        }

        // Rest completes at once for a fully rested agent
        let mut order = Vec::new();
        while let StepReport::Completed(name) = queue.execute(&mut agent, &mut world, &ctx, 0.1) {
            order.push(name);
        }
        assert_eq!(order, vec!["b50", "c50", "a10", "d5"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_completion_promotes_linked_task() {
        let (mut world, mut agent, config) = setup();
        let ctx = ActionContext::new(EntityId(1), &config);
        let mut queue = TaskQueue::new();
        queue.add(rest("other", 20));
        queue.add_linked(vec![rest("first", 10), rest("second", 1), rest("third", 1)]);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.execute(&mut agent, &mut world, &ctx, 0.1), StepReport::Completed("other".into()));
        assert_eq!(queue.execute(&mut agent, &mut world, &ctx, 0.1), StepReport::Completed("first".into()));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.current().map(|t| t.name.as_str()), Some("second"));
        queue.execute(&mut agent, &mut world, &ctx, 0.1);
        assert_eq!(queue.current().map(|t| t.name.as_str()), Some("third"));
        queue.execute(&mut agent, &mut world, &ctx, 0.1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_linked_follow_up_jumps_ahead_of_priorities() {
        let (mut world, mut agent, config) = setup();
        let ctx = ActionContext::new(EntityId(1), &config);
        let mut queue = TaskQueue::new();
        queue.add_linked(vec![rest("go", 60), rest("drink", 0)]);
        queue.add(rest("explore", 30));

        queue.execute(&mut agent, &mut world, &ctx, 0.1);
        assert_eq!(queue.names(), vec!["drink", "explore"]);
    }

    #[test]
    fn test_insufficient_energy_interrupts_without_deduction() {
        let (mut world, mut agent, config) = setup();
        let ctx = ActionContext::new(EntityId(1), &config);
        agent.needs.energy = 0.05;
        let mut queue = TaskQueue::new();
        // Already standing on the target: completes on the first paid step
        let here = Task::new("costly", Action::MoveTo { target: TilePos::new(0, 0) }, 10);
        queue.add(here.with_energy_cost(1.0));

        let report = queue.execute(&mut agent, &mut world, &ctx, 0.1);
        assert_eq!(report, StepReport::Interrupted("costly".into()));
        assert_eq!(agent.needs.energy, 0.05);
        let head = queue.current().unwrap();
        assert_eq!(head.state, TaskState::Interrupted);
        assert!(head.interrupted);
        assert_eq!(queue.len(), 1);

        // Energy back: resumes, pays and completes
        agent.needs.energy = 100.0;
        let report = queue.execute(&mut agent, &mut world, &ctx, 0.1);
        assert_eq!(report, StepReport::Completed("costly".into()));
        assert!((agent.needs.energy - 99.9).abs() < 1e-4);
    }

    #[test]
    fn test_addresses_sees_follow_ups() {
        let mut queue = TaskQueue::new();
        queue.add_linked(vec![rest("go", 10), rest("drink", 10).for_need(Need::Thirst)]);
        assert!(queue.addresses(Need::Thirst));
        assert!(!queue.addresses(Need::Hunger));
    }

    #[test]
    fn test_cancel_releases_reservations() {
        let (mut world, _agent, _config) = setup();
        let id = EntityId(1);
        let tile = TilePos::new(3, 0);
        assert!(world.reserve_destination(tile, id));

        let mut queue = TaskQueue::new();
        queue.add_linked(vec![rest("go", 10), rest("drink", 10).with_reservation(tile)]);
        let cancelled = queue.cancel_current(&mut world, id).unwrap();
        assert_eq!(cancelled.state, TaskState::Cancelled);
        assert!(queue.is_empty());
        assert_eq!(world.tile(tile).destination, None);
    }

    #[test]
    fn test_stalled_task_is_cancelled_after_limit() {
        let (mut world, mut agent, mut config) = setup();
        config.agent.task_stall_limit = 3;
        let ctx = ActionContext::new(EntityId(1), &config);
        let goal = TilePos::new(5, 5);
        world.set_biome(goal, Biome::Water);

        let mut queue = TaskQueue::new();
        queue.add(Task::new("walk", Action::MoveTo { target: goal }, 10));
        assert_eq!(queue.execute(&mut agent, &mut world, &ctx, 0.1), StepReport::Running("walk".into()));
        assert_eq!(queue.execute(&mut agent, &mut world, &ctx, 0.1), StepReport::Running("walk".into()));
        assert_eq!(queue.execute(&mut agent, &mut world, &ctx, 0.1), StepReport::Cancelled("walk".into()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_higher_priority_pauses_current() {
        let (mut world, mut agent, config) = setup();
        let ctx = ActionContext::new(EntityId(1), &config);
        let mut queue = TaskQueue::new();
        queue.add(Task::new("walk", Action::MoveTo { target: TilePos::new(6, 0) }, 10));
        queue.execute(&mut agent, &mut world, &ctx, 0.1);
        assert_eq!(queue.current().map(|t| t.state), Some(TaskState::Executing));

        queue.add(rest("urgent", 90));
        assert_eq!(queue.names(), vec!["urgent", "walk"]);
        assert_eq!(queue.iter().nth(1).map(|t| t.state), Some(TaskState::Pending));
    }
}
