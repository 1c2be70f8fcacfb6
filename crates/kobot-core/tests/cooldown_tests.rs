//! Cooldown confirmation driven through the keyboard trigger

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use kobot_core::control::{
    Confirmation, CooldownLoop, CooldownPolicy, CooldownSource, FailureReason, ManualClock,
};
use kobot_core::input::{InputInjector, KeyboardTrigger, VirtualKey};
use kobot_core::Result;

/// A skill whose cooldown starts when its slot key is pressed.
#[derive(Default)]
struct Skill {
    remaining: f32,
    /// Slot presses the client swallows before the skill fires
    ignored_presses: u32,
    presses: Vec<VirtualKey>,
}

struct SkillCooldown(Rc<RefCell<Skill>>);

impl CooldownSource for SkillCooldown {
    fn sample(&mut self) -> Result<f32> {
        let mut skill = self.0.borrow_mut();
        if skill.remaining > 0.0 {
            skill.remaining = (skill.remaining - 0.05).max(0.0);
        }
        Ok(skill.remaining)
    }
}

struct GameKeyboard(Rc<RefCell<Skill>>);

impl InputInjector for GameKeyboard {
    fn press_and_release(&mut self, key: VirtualKey, _hold: Duration) -> Result<()> {
        let mut skill = self.0.borrow_mut();
        skill.presses.push(key);
        if key == VirtualKey(0x32) && skill.remaining == 0.0 {
            if skill.ignored_presses > 0 {
                skill.ignored_presses -= 1;
            } else {
                skill.remaining = 10.0;
            }
        }
        Ok(())
    }
}

fn setup(skill: Skill) -> (Rc<RefCell<Skill>>, SkillCooldown, KeyboardTrigger<GameKeyboard>) {
    let skill = Rc::new(RefCell::new(skill));
    let trigger = KeyboardTrigger::new(
        GameKeyboard(Rc::clone(&skill)),
        vec![VirtualKey::F1, "2".parse().unwrap()],
        VirtualKey::R,
        Duration::from_millis(10),
    )
    .unwrap();
    (Rc::clone(&skill), SkillCooldown(skill), trigger)
}

#[test]
fn test_swallowed_press_is_retried_until_cooldown_runs() {
    let (skill, mut source, mut trigger) = setup(Skill {
        ignored_presses: 1,
        ..Default::default()
    });
    let policy = CooldownPolicy::default();
    let clock = ManualClock::new();

    let outcome = CooldownLoop::new(&policy, &clock)
        .run(&mut source, &mut trigger)
        .unwrap();

    assert_eq!(outcome.confirmation, Confirmation::Succeeded);
    // First press swallowed, second fires, the rest land on the running cooldown.
    assert_eq!(outcome.triggers, 5);

    let skill = skill.borrow();
    let presses = &skill.presses;
    assert_eq!(presses.len(), 5 * 2 + 1);
    assert_eq!(presses.last(), Some(&VirtualKey::R));
    assert_eq!(
        presses.iter().filter(|&&k| k == VirtualKey::R).count(),
        1
    );
    assert_eq!(clock.elapsed(), policy.settle_delay() * 5);
}

#[test]
fn test_running_cooldown_is_not_triggered() {
    let (skill, mut source, mut trigger) = setup(Skill {
        remaining: 4.0,
        ..Default::default()
    });
    let policy = CooldownPolicy::default();

    let outcome = CooldownLoop::new(&policy, &ManualClock::new())
        .run(&mut source, &mut trigger)
        .unwrap();

    assert_eq!(
        outcome.confirmation,
        Confirmation::Failed(FailureReason::AlreadyOnCooldown)
    );
    assert!(skill.borrow().presses.is_empty());
}

#[test]
fn test_skill_that_never_fires_times_out() {
    let (skill, mut source, mut trigger) = setup(Skill {
        ignored_presses: u32::MAX,
        ..Default::default()
    });
    let policy = CooldownPolicy {
        timeout_ms: 500,
        ..Default::default()
    };

    let outcome = CooldownLoop::new(&policy, &ManualClock::new())
        .run(&mut source, &mut trigger)
        .unwrap();

    assert_eq!(
        outcome.confirmation,
        Confirmation::Failed(FailureReason::TimedOut)
    );
    assert_eq!(outcome.triggers, 10);
    assert!(!skill.borrow().presses.contains(&VirtualKey::R));
}
