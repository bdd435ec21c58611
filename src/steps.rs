use crate::ui;
use log::error;

/// A named, fallible unit of work over a shared context.
pub struct Step<C> {
    pub name: &'static str,
    pub action: fn(&mut C) -> anyhow::Result<()>,
}

impl<C> Step<C> {
    pub fn new(name: &'static str, action: fn(&mut C) -> anyhow::Result<()>) -> Self {
        Self { name, action }
    }
}

#[derive(Debug)]
pub struct FailedStep {
    pub name: &'static str,
    pub error: anyhow::Error,
}

/// What a run got through before it stopped.
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: Vec<&'static str>,
    pub failed: Option<FailedStep>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }

    pub fn into_result(self) -> anyhow::Result<Vec<&'static str>> {
        match self.failed {
            None => Ok(self.completed),
            Some(FailedStep { name, error }) => {
                Err(error.context(format!("Step `{}` failed", name)))
            }
        }
    }
}

/// Runs `steps` in order and stops at the first failure.
pub fn run_steps<C>(section: &str, steps: &[Step<C>], context: &mut C) -> RunReport {
    let mut report = RunReport::default();
    ui::section(section);

    for (index, step) in steps.iter().enumerate() {
        ui::step(index + 1, steps.len(), step.name);
        if let Err(e) = (step.action)(context) {
            error!("Step `{}` failed: {:#}", step.name, e);
            report.failed = Some(FailedStep {
                name: step.name,
                error: e,
            });
            break;
        }
        report.completed.push(step.name);
    }

    report
}
