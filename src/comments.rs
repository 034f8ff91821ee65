//! Comment widget state machine and markup.
//!
//! One widget instance per page view: the UI loop owns a [`WidgetState`],
//! sends [`WidgetCommand`]s to the provider thread and folds the
//! [`Delta`]s it gets back via [`apply_delta`]. Every list delivery
//! re-renders the full list; there is no incremental diffing.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard bound on comment text, enforced client-side before any write.
pub const MAX_COMMENT_LEN: usize = 1000;
/// Page keys are capped so they stay usable as document ids.
pub const MAX_PAGE_KEY_LEN: usize = 100;

const MAX_LOG_LINES: usize = 50;

/// One comment record as the external store returns it. Ids and timestamps
/// are server-assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_photo: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(UserProfile),
}

impl AuthPhase {
    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            AuthPhase::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Stable key scoping one page's comment sub-collection: anything outside
/// `[A-Za-z0-9_-]` becomes `_`, capped at [`MAX_PAGE_KEY_LEN`]. Paths that
/// sanitize to nothing map to `index`.
pub fn page_key(path: &str) -> String {
    let mut key: String = path
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    key.truncate(MAX_PAGE_KEY_LEN);
    if key.trim_matches(['_', '-']).is_empty() {
        "index".to_string()
    } else {
        key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftError {
    Empty,
    TooLong,
}

/// Validate a draft for publishing: trimmed, non-empty, at most
/// [`MAX_COMMENT_LEN`] characters. The publish control stays disabled while
/// this fails.
pub fn validate_draft(text: &str) -> Result<&str, DraftError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DraftError::Empty);
    }
    if trimmed.chars().count() > MAX_COMMENT_LEN {
        return Err(DraftError::TooLong);
    }
    Ok(trimmed)
}

/// State changes pushed by the provider thread.
#[derive(Debug, Clone)]
pub enum Delta {
    AuthChanged(AuthPhase),
    SetComments(Vec<Comment>),
    PostFinished { error: Option<String> },
    DeleteFinished { id: String, error: Option<String> },
    SubscriptionError(String),
    Log(String),
}

/// Requests the UI loop sends to the provider thread.
#[derive(Debug, Clone)]
pub enum WidgetCommand {
    SignIn,
    SignOut,
    Post { text: String },
    Delete { id: String },
    Resubscribe { page_key: String },
}

/// All mutable state of one widget instance.
#[derive(Debug, Clone)]
pub struct WidgetState {
    pub page_key: String,
    pub auth: AuthPhase,
    pub comments: Vec<Comment>,
    pub draft: String,
    pub posting: bool,
    pub deleting: Option<String>,
    pub list_error: Option<String>,
    pub alert: Option<String>,
    pub logs: VecDeque<String>,
}

impl WidgetState {
    pub fn new(page_key: impl Into<String>) -> Self {
        Self {
            page_key: page_key.into(),
            auth: AuthPhase::Anonymous,
            comments: Vec::new(),
            draft: String::new(),
            posting: false,
            deleting: None,
            list_error: None,
            alert: None,
            logs: VecDeque::new(),
        }
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.auth.user()
    }

    /// Publishing is possible only when signed in, idle and holding a valid
    /// draft.
    pub fn can_post(&self) -> bool {
        self.current_user().is_some() && !self.posting && validate_draft(&self.draft).is_ok()
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push_back(line.into());
        while self.logs.len() > MAX_LOG_LINES {
            self.logs.pop_front();
        }
    }
}

/// Fold one provider delta into the widget state.
pub fn apply_delta(state: &mut WidgetState, delta: Delta) {
    match delta {
        Delta::AuthChanged(phase) => {
            state.auth = phase;
        }
        Delta::SetComments(comments) => {
            state.comments = comments;
            state.list_error = None;
        }
        Delta::PostFinished { error } => {
            state.posting = false;
            match error {
                None => {
                    state.draft.clear();
                    state.alert = None;
                }
                Some(message) => {
                    state.alert = Some(format!("No se pudo publicar: {message}"));
                }
            }
        }
        Delta::DeleteFinished { id, error } => {
            if state.deleting.as_deref() == Some(id.as_str()) {
                state.deleting = None;
            }
            if let Some(message) = error {
                state.alert = Some(format!("No se pudo borrar: {message}"));
            }
        }
        Delta::SubscriptionError(message) => {
            state.list_error = Some(message);
        }
        Delta::Log(line) => state.push_log(line),
    }
}

/// Full widget markup: header, input form, list.
pub fn render_widget(state: &WidgetState) -> String {
    format!(
        "<div class=\"comments-widget\">\n{}\n{}\n{}\n</div>",
        render_header(state),
        render_form(state),
        render_list(state)
    )
}

fn render_header(state: &WidgetState) -> String {
    match &state.auth {
        AuthPhase::Anonymous => {
            "<div class=\"comments-header\"><button class=\"sign-in\">Iniciar sesión</button></div>"
                .to_string()
        }
        AuthPhase::Authenticating => {
            "<div class=\"comments-header\"><span class=\"signing-in\">Conectando…</span></div>"
                .to_string()
        }
        AuthPhase::Authenticated(user) => {
            let avatar = if user.photo.is_empty() {
                String::new()
            } else {
                format!(
                    "<img class=\"avatar\" src=\"{}\" alt=\"{}\"> ",
                    esc(&user.photo),
                    esc(&user.name)
                )
            };
            format!(
                "<div class=\"comments-header\">{avatar}<span class=\"user-name\">{}</span> <button class=\"sign-out\">Salir</button></div>",
                esc(&user.name)
            )
        }
    }
}

fn render_form(state: &WidgetState) -> String {
    let disabled = if state.can_post() { "" } else { " disabled" };
    format!(
        "<form class=\"comment-form\">\n<textarea maxlength=\"{MAX_COMMENT_LEN}\" placeholder=\"Escribe un comentario…\">{}</textarea>\n<button type=\"submit\"{disabled}>Publicar</button>\n</form>",
        esc(&state.draft)
    )
}

/// The list area: an error placeholder when the subscription failed, an
/// invitation when there is nothing yet, otherwise every comment newest
/// first as delivered.
pub fn render_list(state: &WidgetState) -> String {
    if state.list_error.is_some() {
        return "<div class=\"comments-list comments-error\">No se pudieron cargar los comentarios.</div>"
            .to_string();
    }
    if state.comments.is_empty() {
        return "<div class=\"comments-list comments-empty\">Sé el primero en comentar.</div>"
            .to_string();
    }
    let items: Vec<String> = state
        .comments
        .iter()
        .map(|c| comment_html(c, state.current_user()))
        .collect();
    format!(
        "<div class=\"comments-list\">\n{}\n</div>",
        items.join("\n")
    )
}

/// One comment. The delete control renders only for the author's own
/// comments; a non-owner never sees it.
pub fn comment_html(comment: &Comment, viewer: Option<&UserProfile>) -> String {
    let avatar = if comment.user_photo.is_empty() {
        String::new()
    } else {
        format!(
            "<img class=\"avatar\" src=\"{}\" alt=\"{}\"> ",
            esc(&comment.user_photo),
            esc(&comment.user_name)
        )
    };
    let delete = match viewer {
        Some(user) if user.id == comment.user_id => format!(
            "<button class=\"delete\" data-id=\"{}\">Borrar</button>",
            esc(&comment.id)
        ),
        _ => String::new(),
    };
    format!(
        "<div class=\"comment\" data-id=\"{}\">\n{avatar}<span class=\"author\">{}</span> <time datetime=\"{}\">{}</time>\n<p>{}</p>\n{delete}\n</div>",
        esc(&comment.id),
        esc(&comment.user_name),
        comment.created_at.to_rfc3339(),
        comment.created_at.format("%Y-%m-%d %H:%M"),
        esc(&comment.text)
    )
}

fn esc(s: &str) -> String {
    crate::render::escape_html(s)
}
