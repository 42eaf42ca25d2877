//! Birthdays section
//!
//! Contacts are not queried yet; the section always reports that there are
//! no birthdays today. The contacts client id is accepted and held so the
//! constructor stays stable once the contacts API is wired in, but it does
//! not influence the output.

use async_trait::async_trait;

use crate::briefing::Provider;
use crate::i18n::{self, keys};
use crate::Result;

pub struct Birthdays {
    #[allow(dead_code)]
    client_id: String,
    lang: String,
}

impl Birthdays {
    pub fn new(client_id: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            lang: lang.into(),
        }
    }
}

#[async_trait]
impl Provider for Birthdays {
    fn name(&self) -> &str {
        "birthdays"
    }

    async fn fetch(&self) -> Result<String> {
        Ok(i18n::get(keys::NO_BIRTHDAYS, &self.lang).to_string())
    }
}
