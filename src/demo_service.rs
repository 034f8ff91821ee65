//! In-process stand-in for the external identity+document service, used by
//! the console demo and the tests. Interchangeable with the HTTP client via
//! the `LAQP_COMMENTS_SOURCE` switch.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::comment_service::{CommentService, ServiceError};
use crate::comments::{Comment, MAX_COMMENT_LEN, UserProfile};

pub struct DemoCommentService {
    user: Option<UserProfile>,
    store: HashMap<String, Vec<Comment>>,
    next_id: u64,
    last_stamp: DateTime<Utc>,
}

impl DemoCommentService {
    pub fn new() -> Self {
        Self {
            user: None,
            store: HashMap::new(),
            next_id: 1,
            last_stamp: Utc::now() - Duration::hours(3),
        }
    }

    /// Store pre-filled with a couple of regulars so the demo page never
    /// starts empty.
    pub fn seeded(page_key: &str) -> Self {
        let mut service = Self::new();
        service.seed(page_key, "capitan-rayo", "CapitánRayo", "Golazo de chilena en el 89'. Este mod es historia.");
        service.seed(page_key, "el-tano-10", "ElTano10", "¿Cuándo sale el parche con la tercera equipación?");
        service
    }

    fn seed(&mut self, page_key: &str, user_id: &str, user_name: &str, text: &str) {
        let stamp = self.next_stamp();
        let comment = Comment {
            id: format!("c{}", self.bump_id()),
            text: text.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            user_photo: String::new(),
            created_at: stamp,
            updated_at: None,
        };
        self.store.entry(page_key.to_string()).or_default().push(comment);
    }

    fn bump_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Server timestamps are monotonic-ish: never behind the wall clock,
    /// never equal to the previous one.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let candidate = Utc::now();
        let floor = self.last_stamp + Duration::seconds(1);
        self.last_stamp = candidate.max(floor);
        self.last_stamp
    }
}

impl Default for DemoCommentService {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentService for DemoCommentService {
    fn sign_in(&mut self) -> Result<UserProfile, ServiceError> {
        if let Some(user) = &self.user {
            return Ok(user.clone());
        }
        let n: u32 = rand::thread_rng().gen_range(100..1000);
        let user = UserProfile {
            id: format!("visitante-{n}"),
            name: format!("Visitante {n}"),
            photo: String::new(),
        };
        self.user = Some(user.clone());
        Ok(user)
    }

    fn sign_out(&mut self) -> Result<(), ServiceError> {
        self.user = None;
        Ok(())
    }

    fn current_user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    fn list_comments(&self, page_key: &str) -> Result<Vec<Comment>, ServiceError> {
        let mut comments = self.store.get(page_key).cloned().unwrap_or_default();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    fn add_comment(&mut self, page_key: &str, text: &str) -> Result<Comment, ServiceError> {
        let Some(user) = self.user.clone() else {
            return Err(ServiceError::Write("sin sesión".to_string()));
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::Write("texto vacío".to_string()));
        }
        if trimmed.chars().count() > MAX_COMMENT_LEN {
            return Err(ServiceError::Write("texto demasiado largo".to_string()));
        }
        let stamp = self.next_stamp();
        let comment = Comment {
            id: format!("c{}", self.bump_id()),
            text: trimmed.to_string(),
            user_id: user.id,
            user_name: user.name,
            user_photo: user.photo,
            created_at: stamp,
            updated_at: None,
        };
        self.store
            .entry(page_key.to_string())
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    fn delete_comment(&mut self, page_key: &str, comment_id: &str) -> Result<(), ServiceError> {
        let Some(user) = &self.user else {
            return Err(ServiceError::Write("sin sesión".to_string()));
        };
        let Some(comments) = self.store.get_mut(page_key) else {
            return Err(ServiceError::Write("comentario inexistente".to_string()));
        };
        let Some(idx) = comments.iter().position(|c| c.id == comment_id) else {
            return Err(ServiceError::Write("comentario inexistente".to_string()));
        };
        if comments[idx].user_id != user.id {
            return Err(ServiceError::Write(
                "solo el autor puede borrar".to_string(),
            ));
        }
        comments.remove(idx);
        Ok(())
    }
}
