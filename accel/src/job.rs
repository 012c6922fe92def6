// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use crate::{Error, ErrorKind, Result, Selection};

/* Where a context is in its create/feed/start/wait cycle */
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage {
    /* created or resumed, accepts input */
    Ready,
    /* an operation was started, wait() must be called */
    Running { save: bool },
    /* state saved, resume_state() must be called before use */
    Saved,
    /* final operation completed, the context is consumed */
    Done,
}

#[derive(Clone, Debug)]
pub(crate) struct Job {
    stage: Stage,
    /* error reported at wait() time */
    deferred: Option<ErrorKind>,
}

impl Job {
    pub fn new() -> Job {
        Job {
            stage: Stage::Ready,
            deferred: None,
        }
    }

    pub fn check_ready(&self) -> Result<()> {
        match self.stage {
            Stage::Ready => Ok(()),
            Stage::Saved => Err(Error::with_msg(
                ErrorKind::BadState,
                "context used without resuming it",
            )),
            Stage::Running { .. } => Err(Error::with_msg(
                ErrorKind::BadState,
                "context used while an operation is pending",
            )),
            Stage::Done => Err(Error::with_msg(
                ErrorKind::BadState,
                "context already consumed",
            )),
        }
    }

    pub fn start(&mut self, save: bool) -> Result<()> {
        self.check_ready()?;
        self.stage = Stage::Running { save: save };
        Ok(())
    }

    pub fn defer_error(&mut self, kind: ErrorKind) {
        self.deferred = Some(kind);
    }

    pub fn wait(&mut self) -> Result<()> {
        self.stage = match self.stage {
            Stage::Running { save: true } => Stage::Saved,
            Stage::Running { save: false } => Stage::Done,
            _ => {
                return Err(Error::with_msg(
                    ErrorKind::BadState,
                    "wait without a started operation",
                ))
            }
        };
        match self.deferred.take() {
            Some(kind) => Err(Error::new(kind)),
            None => Ok(()),
        }
    }

    pub fn resume(&mut self, _sel: &Selection) -> Result<()> {
        if self.stage != Stage::Saved {
            return Err(Error::with_msg(
                ErrorKind::BadState,
                "resume of a context that was not saved",
            ));
        }
        self.stage = Stage::Ready;
        Ok(())
    }

    pub fn is_saved(&self) -> bool {
        self.stage == Stage::Saved
    }
}
