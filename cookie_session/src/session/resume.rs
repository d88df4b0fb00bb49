use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::session::errors::SessionError;
use crate::utils::gen_random_string;

const TICKET_LENGTH: usize = 32;

#[derive(Debug, Clone)]
struct ResumeTicket {
    user_id: String,
    csrf_token: String,
    expires_at: DateTime<Utc>,
}

/// One-time tickets that let a mutating request survive the refresh redirect.
///
/// The refresh flow mints a ticket bound to the user and to the CSRF token of
/// the freshly issued access session; the guard redeems it once, for that
/// user only, in place of the CSRF field the browser could not resend.
#[derive(Debug)]
pub struct ResumeTickets {
    ttl: Duration,
    tickets: Mutex<HashMap<String, ResumeTicket>>,
}

impl ResumeTickets {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tickets: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn mint(
        &self,
        user_id: &str,
        csrf_token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let ticket = gen_random_string(TICKET_LENGTH)?;
        let mut tickets = self.tickets.lock().await;
        tickets.retain(|_, t| now < t.expires_at);
        tickets.insert(
            ticket.clone(),
            ResumeTicket {
                user_id: user_id.to_string(),
                csrf_token: csrf_token.to_string(),
                expires_at: now + self.ttl,
            },
        );
        Ok(ticket)
    }

    /// Redeem `ticket` for `user_id`, returning the CSRF token it was bound to.
    ///
    /// A ticket presented by a different user is left in place for its owner.
    pub(crate) async fn redeem(
        &self,
        ticket: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let mut tickets = self.tickets.lock().await;
        match tickets.get(ticket) {
            Some(t) if t.user_id != user_id => {
                tracing::warn!("Resume ticket presented by a different user");
                None
            }
            Some(t) if now >= t.expires_at => {
                tickets.remove(ticket);
                None
            }
            Some(_) => tickets.remove(ticket).map(|t| t.csrf_token),
            None => None,
        }
    }

    /// Drop expired tickets. Returns how many were removed.
    pub(crate) async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tickets = self.tickets.lock().await;
        let before = tickets.len();
        tickets.retain(|_, t| now < t.expires_at);
        before - tickets.len()
    }
}
