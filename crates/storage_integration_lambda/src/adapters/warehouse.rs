use storage_integration_core::config::WarehouseCredentials;
use storage_integration_core::statements::Statement;
use tracing::warn;

/// Result of one executed statement. Cell values are rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub query_id: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

pub trait WarehouseSession {
    fn execute(&mut self, statement: &Statement) -> Result<QueryResult, String>;
    fn close(&mut self) -> Result<(), String>;
}

pub trait WarehouseConnector {
    fn connect(
        &self,
        credentials: &WarehouseCredentials,
    ) -> Result<Box<dyn WarehouseSession>, String>;
}

/// Owns an open session and guarantees it is closed exactly once.
///
/// `finish` closes explicitly and reports the outcome; dropping an unfinished
/// guard (early `?` return) still closes the session and logs close failures.
pub struct ScopedSession {
    session: Box<dyn WarehouseSession>,
    closed: bool,
}

impl ScopedSession {
    pub fn new(session: Box<dyn WarehouseSession>) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<QueryResult, String> {
        self.session.execute(statement)
    }

    pub fn finish(mut self) -> Result<(), String> {
        self.closed = true;
        self.session.close()
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.session.close() {
            warn!(error = %error, "failed to close warehouse session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct CountingSession {
        closes: Arc<Mutex<usize>>,
        fail_close: bool,
    }

    impl WarehouseSession for CountingSession {
        fn execute(&mut self, _statement: &Statement) -> Result<QueryResult, String> {
            Ok(QueryResult::default())
        }

        fn close(&mut self) -> Result<(), String> {
            *self.closes.lock().expect("poisoned mutex") += 1;
            if self.fail_close {
                Err("close failed".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn guard(fail_close: bool) -> (ScopedSession, Arc<Mutex<usize>>) {
        let closes = Arc::new(Mutex::new(0));
        let session = CountingSession {
            closes: Arc::clone(&closes),
            fail_close,
        };
        (ScopedSession::new(Box::new(session)), closes)
    }

    #[test]
    fn finish_closes_once_and_reports_errors() {
        let (session, closes) = guard(true);
        assert_eq!(session.finish(), Err("close failed".to_string()));
        assert_eq!(*closes.lock().expect("poisoned mutex"), 1);
    }

    #[test]
    fn dropping_an_unfinished_guard_closes_the_session() {
        let (session, closes) = guard(false);
        drop(session);
        assert_eq!(*closes.lock().expect("poisoned mutex"), 1);
    }

    #[test]
    fn drop_after_finish_does_not_close_twice() {
        let (session, closes) = guard(false);
        session.finish().expect("close should succeed");
        assert_eq!(*closes.lock().expect("poisoned mutex"), 1);
    }
}
