//! Evaluation worker.
//!
//! Input lines go to a dedicated thread that owns the evaluation; each one
//! comes back as `(success, value)`, where a failed evaluation carries its
//! error message as a string value.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use log::debug;
use ren_bind::{Engine, Loadable, Value};

pub type Reply = (bool, Value);

pub struct Session {
    requests: Option<Sender<String>>,
    replies: Receiver<Reply>,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    pub fn start(engine: Arc<Engine>) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<String>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();

        let worker = thread::Builder::new()
            .name("ren-eval".to_string())
            .spawn(move || {
                for line in request_rx {
                    let reply = evaluate(&engine, &line);
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                debug!("evaluation worker stopped");
            })
            .context("Failed to start evaluation worker")?;

        Ok(Session {
            requests: Some(request_tx),
            replies: reply_rx,
            worker: Some(worker),
        })
    }

    /// Evaluate one line on the worker and wait for its reply.
    pub fn submit(&self, line: &str) -> Result<Reply> {
        self.requests
            .as_ref()
            .ok_or_else(|| anyhow!("session is closed"))?
            .send(line.to_string())
            .map_err(|_| anyhow!("evaluation worker has stopped"))?;
        self.replies
            .recv()
            .map_err(|_| anyhow!("evaluation worker has stopped"))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn evaluate(engine: &Engine, line: &str) -> Reply {
    ren_logging::with_eval_span(engine.handle().0, line, || {
        match engine.evaluate(&[Loadable::from(line)]) {
            Ok(value) => (true, value),
            Err(e) => (false, Value::String(e.to_string())),
        }
    })
}

/// Console rendering of a reply; unset results print nothing.
pub fn render((success, value): &Reply) -> Option<String> {
    match (success, value) {
        (true, Value::Unset) => None,
        (true, value) => Some(format!("== {value}")),
        (false, Value::String(message)) => Some(format!("** {message}")),
        (false, value) => Some(format!("** {value}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ren_bind::{make_function, EngineConfig};

    #[test]
    fn test_worker_replies_in_order() {
        let engine = Engine::create(EngineConfig::default()).unwrap();
        let inc = make_function!(&engine, "n [integer!]", |n: i64| n + 1).unwrap();
        engine
            .set_word(engine.user_context(), "inc", Value::Function(inc))
            .unwrap();

        let session = Session::start(engine).unwrap();
        assert_eq!(session.submit("inc 1").unwrap(), (true, Value::Integer(2)));
        let (ok, message) = session.submit("inc \"x\"").unwrap();
        assert!(!ok);
        assert!(message.to_string().contains("integer!"));
        assert_eq!(session.submit("[a b]").unwrap().0, true);
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&(true, Value::Integer(7))).as_deref(), Some("== 7"));
        assert_eq!(render(&(true, Value::Unset)), None);
        assert_eq!(
            render(&(false, Value::String("boom".into()))).as_deref(),
            Some("** boom")
        );
    }
}
