use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;

use super::{ContentStore, DirectResolution, StoreError, StoreResult};
use crate::models::{Conversation, Message, NewConversation, NewMessage, Participant, Profile, RequestStatus};

const CONVERSATION_COLUMNS: &str =
    "id, is_group, title, created_by, request_status, direct_key, created_at, updated_at, last_message_at";

const PARTICIPANT_COLUMNS: &str =
    "conversation_id, user_id, joined_at, left_at, is_muted, last_read_at, unread_count";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, encrypted_content, preview, content_type, \
     media_url, listing_id, is_deleted, is_edited, edited_at, created_at";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn insert_conversation(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        new: &NewConversation,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO conversations (id, is_group, title, created_by, request_status, direct_key, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&new.id)
        .bind(new.is_group)
        .bind(&new.title)
        .bind(&new.created_by)
        .bind(new.request_status)
        .bind(new.direct_key())
        .bind(&new.created_at)
        .bind(&new.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_participants(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        new: &NewConversation,
    ) -> StoreResult<()> {
        for user_id in &new.participant_ids {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id, joined_at) VALUES (?, ?, ?)",
            )
            .bind(&new.id)
            .bind(user_id)
            .bind(&new.created_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn create_conversation(&self, new: NewConversation) -> StoreResult<Conversation> {
        let mut tx = self.db.begin().await?;
        Self::insert_conversation(&mut tx, &new).await?;
        Self::insert_participants(&mut tx, &new).await?;
        tx.commit().await?;
        Ok(new.into_conversation())
    }

    async fn find_or_create_direct(
        &self,
        new: NewConversation,
    ) -> StoreResult<Option<DirectResolution>> {
        let Some(key) = new.direct_key() else {
            return Ok(None);
        };

        let mut tx = self.db.begin().await?;

        // The unique direct_key makes the insert a no-op when the pair
        // already has a conversation.
        let inserted = sqlx::query(
            r#"INSERT INTO conversations (id, is_group, title, created_by, request_status, direct_key, created_at, updated_at)
               VALUES (?, 0, NULL, ?, ?, ?, ?, ?)
               ON CONFLICT(direct_key) DO NOTHING"#,
        )
        .bind(&new.id)
        .bind(&new.created_by)
        .bind(new.request_status)
        .bind(&key)
        .bind(&new.created_at)
        .bind(&new.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            Self::insert_participants(&mut tx, &new).await?;
        }

        let sql = format!("SELECT {} FROM conversations WHERE direct_key = ?", CONVERSATION_COLUMNS);
        let conversation = sqlx::query_as::<_, Conversation>(&sql)
            .bind(&key)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(DirectResolution {
            conversation,
            created: inserted,
        }))
    }

    async fn conversation(&self, id: &str) -> StoreResult<Option<Conversation>> {
        let sql = format!("SELECT {} FROM conversations WHERE id = ?", CONVERSATION_COLUMNS);
        Ok(sqlx::query_as::<_, Conversation>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn conversations(&self, ids: &[String]) -> StoreResult<Vec<Conversation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM conversations WHERE id IN ({})",
            CONVERSATION_COLUMNS,
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, Conversation>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.db).await?)
    }

    async fn transition_request(
        &self,
        id: &str,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<bool> {
        let now = crate::models::now_timestamp();
        let result = sqlx::query(
            "UPDATE conversations SET request_status = ?, updated_at = ? \
             WHERE id = ? AND request_status = ?",
        )
        .bind(to)
        .bind(&now)
        .bind(id)
        .bind(from)
        .execute(&self.db)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_conversation(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn active_memberships(&self, user_id: &str) -> StoreResult<Vec<Participant>> {
        let sql = format!(
            "SELECT {} FROM conversation_participants WHERE user_id = ? AND left_at IS NULL",
            PARTICIPANT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Participant>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?)
    }

    async fn active_participants(&self, conversation_id: &str) -> StoreResult<Vec<Participant>> {
        let sql = format!(
            "SELECT {} FROM conversation_participants WHERE conversation_id = ? AND left_at IS NULL ORDER BY joined_at",
            PARTICIPANT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Participant>(&sql)
            .bind(conversation_id)
            .fetch_all(&self.db)
            .await?)
    }

    async fn participants_for(
        &self,
        conversation_ids: &[String],
    ) -> StoreResult<HashMap<String, Vec<Participant>>> {
        let mut map: HashMap<String, Vec<Participant>> = HashMap::new();
        if conversation_ids.is_empty() {
            return Ok(map);
        }
        let sql = format!(
            "SELECT {} FROM conversation_participants WHERE conversation_id IN ({}) AND left_at IS NULL ORDER BY joined_at",
            PARTICIPANT_COLUMNS,
            placeholders(conversation_ids.len())
        );
        let mut query = sqlx::query_as::<_, Participant>(&sql);
        for id in conversation_ids {
            query = query.bind(id);
        }
        for participant in query.fetch_all(&self.db).await? {
            map.entry(participant.conversation_id.clone())
                .or_default()
                .push(participant);
        }
        Ok(map)
    }

    async fn add_participant(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO conversation_participants (conversation_id, user_id, joined_at)
               VALUES (?, ?, ?)
               ON CONFLICT(conversation_id, user_id)
               DO UPDATE SET left_at = NULL, joined_at = excluded.joined_at, unread_count = 0"#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn mark_left(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            "UPDATE conversation_participants SET left_at = ? WHERE conversation_id = ? AND user_id = ? AND left_at IS NULL",
        )
        .bind(at)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        // Free the pair key so the two users can start over later.
        sqlx::query("UPDATE conversations SET direct_key = NULL, updated_at = ? WHERE id = ? AND is_group = 0")
            .bind(at)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_muted(&self, conversation_id: &str, user_id: &str, muted: bool) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE conversation_participants SET is_muted = ? WHERE conversation_id = ? AND user_id = ? AND left_at IS NULL",
        )
        .bind(muted)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn mark_read(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE conversation_participants SET last_read_at = ?, unread_count = 0 WHERE conversation_id = ? AND user_id = ? AND left_at IS NULL",
        )
        .bind(at)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn append_message(&self, new: NewMessage) -> StoreResult<Message> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, sender_id, encrypted_content, preview, content_type, media_url, listing_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&new.id)
        .bind(&new.conversation_id)
        .bind(&new.sender_id)
        .bind(&new.encrypted_content)
        .bind(&new.preview)
        .bind(&new.content_type)
        .bind(&new.media_url)
        .bind(&new.listing_id)
        .bind(&new.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE conversation_participants SET unread_count = unread_count + 1 WHERE conversation_id = ? AND user_id != ? AND left_at IS NULL",
        )
        .bind(&new.conversation_id)
        .bind(&new.sender_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET last_message_at = ?, updated_at = ? WHERE id = ?")
            .bind(&new.created_at)
            .bind(&new.created_at)
            .bind(&new.conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(new.into_message())
    }

    async fn messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        let sql = format!(
            "SELECT {} FROM messages WHERE conversation_id = ? AND is_deleted = 0 ORDER BY created_at ASC, rowid ASC",
            MESSAGE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(conversation_id)
            .fetch_all(&self.db)
            .await?)
    }

    async fn message(&self, id: &str) -> StoreResult<Option<Message>> {
        let sql = format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS);
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn latest_messages(
        &self,
        conversation_ids: &[String],
    ) -> StoreResult<HashMap<String, Message>> {
        if conversation_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"SELECT {} FROM messages m
               WHERE m.conversation_id IN ({})
                 AND m.rowid = (
                   SELECT l.rowid FROM messages l
                   WHERE l.conversation_id = m.conversation_id AND l.is_deleted = 0
                   ORDER BY l.created_at DESC, l.rowid DESC
                   LIMIT 1
                 )"#,
            MESSAGE_COLUMNS,
            placeholders(conversation_ids.len())
        );
        let mut query = sqlx::query_as::<_, Message>(&sql);
        for id in conversation_ids {
            query = query.bind(id);
        }
        Ok(query
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.conversation_id.clone(), m))
            .collect())
    }

    async fn soft_delete_message(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE messages SET is_deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn edit_message(
        &self,
        id: &str,
        encrypted_content: &str,
        preview: &str,
        at: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE messages SET encrypted_content = ?, preview = ?, is_edited = 1, edited_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(encrypted_content)
        .bind(preview)
        .bind(at)
        .bind(id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn profiles(&self, ids: &[String]) -> StoreResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"SELECT id, username, name AS display_name, image AS avatar_url FROM "user" WHERE id IN ({})"#,
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, Profile>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.db).await?)
    }

    async fn is_following(&self, follower_id: &str, followee_id: &str) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }
}
