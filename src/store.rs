//! In-memory store of conversation threads.
//!
//! The store owns every [`Chat`] and tracks which one is current.  It is the sidebar of the
//! client: listing, selecting, renaming, starring and deleting chats all happen here.

use crate::error::{Error, Result};
use crate::types::Chat;

/// Owns the chats of a session and remembers the current one.
#[derive(Debug, Default, Clone)]
pub struct ChatStore {
    chats: Vec<Chat>,
    current: Option<String>,
}

impl ChatStore {
    /// Creates an empty store with no current chat.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chat, selects it, and returns its id.
    pub fn create(&mut self, title: impl Into<String>) -> String {
        let title: String = title.into();
        let chat = Chat::new(title.trim());
        let id = chat.id.clone();
        self.chats.push(chat);
        self.current = Some(id.clone());
        id
    }

    /// Makes the chat with `id` current.
    pub fn select(&mut self, id: &str) -> Result<()> {
        if !self.chats.iter().any(|c| c.id == id) {
            return Err(not_found(id));
        }
        self.current = Some(id.to_string());
        Ok(())
    }

    /// Returns the id of the current chat.
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Returns the current chat.
    pub fn current(&self) -> Option<&Chat> {
        let id = self.current.as_deref()?;
        self.chats.iter().find(|c| c.id == id)
    }

    /// Returns the current chat mutably.
    pub fn current_mut(&mut self) -> Option<&mut Chat> {
        let id = self.current.as_deref()?;
        self.chats.iter_mut().find(|c| c.id == id)
    }

    /// Deselects the current chat; the next prompt starts a new one.
    pub fn new_chat(&mut self) {
        self.current = None;
    }

    /// Renames a chat.  Titles are trimmed and may not be blank.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::validation(
                "Chat title cannot be empty",
                Some("title".to_string()),
            ));
        }
        let chat = self.get_mut(id)?;
        chat.title = title.to_string();
        Ok(())
    }

    /// Flips the starred flag and returns the new value.
    pub fn toggle_star(&mut self, id: &str) -> Result<bool> {
        let chat = self.get_mut(id)?;
        chat.starred = !chat.starred;
        Ok(chat.starred)
    }

    /// Removes a chat and returns it.  Deleting the current chat leaves none selected.
    pub fn delete(&mut self, id: &str) -> Result<Chat> {
        let index = self
            .chats
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        Ok(self.chats.remove(index))
    }

    /// Returns the chat with `id`.
    pub fn get(&self, id: &str) -> Result<&Chat> {
        self.chats
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))
    }

    /// Returns the chat with `id` mutably.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Chat> {
        self.chats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))
    }

    /// Lists chats the way the sidebar shows them: starred first, then newest first.
    pub fn list(&self) -> Vec<&Chat> {
        let mut chats: Vec<(usize, &Chat)> = self.chats.iter().enumerate().collect();
        // Creation order breaks ties between chats created within the same instant.
        chats.sort_by(|(ia, a), (ib, b)| {
            b.starred
                .cmp(&a.starred)
                .then_with(|| b.created.cmp(&a.created))
                .then_with(|| ib.cmp(ia))
        });
        chats.into_iter().map(|(_, chat)| chat).collect()
    }

    /// Replaces every chat.  The current chat is kept only if it is still present.
    pub fn load(&mut self, chats: Vec<Chat>) {
        self.chats = chats;
        if let Some(id) = self.current.as_deref()
            && !self.chats.iter().any(|c| c.id == id)
        {
            self.current = None;
        }
    }

    /// Returns the number of chats.
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    /// Returns true when there are no chats.
    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}

fn not_found(id: &str) -> Error {
    Error::not_found(
        format!("No chat with id {id}"),
        Some("chat".to_string()),
        Some(id.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn create_selects_the_new_chat() {
        let mut store = ChatStore::new();
        assert!(store.is_empty());
        assert!(store.current().is_none());

        let id = store.create("  First  ");
        assert_eq!(store.len(), 1);
        assert_eq!(store.current_id(), Some(id.as_str()));
        assert_eq!(store.current().map(|c| c.title.as_str()), Some("First"));
    }

    #[test]
    fn select_unknown_is_not_found() {
        let mut store = ChatStore::new();
        let err = store.select("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn rename_trims_and_rejects_blank() {
        let mut store = ChatStore::new();
        let id = store.create("old");
        store.rename(&id, "  new title ").unwrap();
        assert_eq!(store.get(&id).unwrap().title, "new title");
        assert!(store.rename(&id, "   ").unwrap_err().is_validation());
        assert!(store.rename("missing", "x").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_current_clears_selection() {
        let mut store = ChatStore::new();
        let a = store.create("a");
        let b = store.create("b");
        store.delete(&a).unwrap();
        assert_eq!(store.current_id(), Some(b.as_str()));
        store.delete(&b).unwrap();
        assert!(store.current().is_none());
        assert!(store.is_empty());
        assert!(store.delete(&b).unwrap_err().is_not_found());
    }

    #[test]
    fn list_is_starred_then_newest() {
        let mut store = ChatStore::new();
        let old = store.create("old");
        let mid = store.create("mid");
        let new = store.create("new");
        store.get_mut(&old).unwrap().created = datetime!(2025-01-01 00:00 UTC);
        store.get_mut(&mid).unwrap().created = datetime!(2025-02-01 00:00 UTC);
        store.get_mut(&new).unwrap().created = datetime!(2025-03-01 00:00 UTC);
        assert!(store.toggle_star(&old).unwrap());

        let titles: Vec<&str> = store.list().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["old", "new", "mid"]);

        assert!(!store.toggle_star(&old).unwrap());
        let titles: Vec<&str> = store.list().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn new_chat_deselects() {
        let mut store = ChatStore::new();
        store.create("a");
        store.new_chat();
        assert!(store.current().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn load_replaces_everything() {
        let mut store = ChatStore::new();
        store.create("a");
        let replacement = vec![Chat::new("x"), Chat::new("y")];
        let kept = replacement[1].id.clone();
        store.load(replacement);
        assert_eq!(store.len(), 2);
        assert!(store.current().is_none());

        store.select(&kept).unwrap();
        let again = store.get(&kept).unwrap().clone();
        store.load(vec![again]);
        assert_eq!(store.current_id(), Some(kept.as_str()));
    }
}
