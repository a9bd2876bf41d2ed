//! # Session REST API Handlers
//!
//! ## Available Endpoints:
//! - `POST /session` - Hand out a new session identifier
//! - `POST /session/{session_id}/audio` - Transcribe a clip and reply to it
//!
//! ## Audio pipeline:
//! 1. Read the multipart upload and check it is `audio/*`
//! 2. Transcribe it
//! 3. Append the transcript to the session window and read the window back
//! 4. Generate the mirroring reply from the window
//!
//! Each step is a single attempt. If step 4 fails the transcript from step 3
//! stays in the window; the client sees a 500 and may upload again.

use crate::error::{AppError, AppResult};
use crate::session::SessionId;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Serialize;
use tracing::info;

/// Filename hint used when the upload does not carry one.
const DEFAULT_FILENAME: &str = "audio.webm";

/// Multipart field names accepted for the clip. The first such field in the
/// body is used.
const AUDIO_FIELDS: &[&str] = &["file", "audio"];

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct AudioResponse {
    pub session_id: SessionId,
    pub transcript: String,
    pub response: String,
}

struct AudioUpload {
    bytes: Vec<u8>,
    filename: String,
}

/// Create a new session.
///
/// ## Endpoint: `POST /session`
///
/// Nothing is written to the store: the session's window is created by its
/// first audio upload.
///
/// ## Response:
/// ```json
/// { "session_id": "0d6f3c1e-5b8e-4a39-9a51-2f7f0e0c6a11" }
/// ```
pub async fn create_session() -> HttpResponse {
    let session_id = SessionId::generate();
    info!(session_id = %session_id, "Session created");
    HttpResponse::Ok().json(CreateSessionResponse { session_id })
}

/// Transcribe an uploaded clip and reply to it.
///
/// ## Endpoint: `POST /session/{session_id}/audio`
///
/// ## Request:
/// Multipart form data with the clip in a field named `file` whose content
/// type starts with `audio/`.
///
/// ## Response:
/// ```json
/// {
///   "session_id": "0d6f3c1e-5b8e-4a39-9a51-2f7f0e0c6a11",
///   "transcript": "I'm so tired of explaining myself.",
///   "response": "There is a quiet exhaustion in having to justify yourself again and again."
/// }
/// ```
pub async fn process_audio(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let session_id = SessionId::parse(path.into_inner())?;
    let upload = read_audio_upload(payload, state.config.upload.max_audio_bytes).await?;

    info!(
        session_id = %session_id,
        size_bytes = upload.bytes.len(),
        filename = %upload.filename,
        "Audio received"
    );

    let transcript = state
        .transcriber
        .transcribe(upload.bytes, &upload.filename)
        .await?;

    let window = state.window.append_and_fetch(&session_id, &transcript).await?;

    let response = state.responder.build_response(&window).await?;

    Ok(HttpResponse::Ok().json(AudioResponse {
        session_id,
        transcript,
        response,
    }))
}

async fn read_audio_upload(mut payload: Multipart, max_bytes: usize) -> AppResult<AudioUpload> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(malformed)?;

        let is_audio_field = field
            .name()
            .is_some_and(|name| AUDIO_FIELDS.contains(&name));
        if !is_audio_field {
            // Fields are read in order; an unread field blocks the next one
            while let Some(chunk) = field.next().await {
                chunk.map_err(malformed)?;
            }
            continue;
        }

        let is_audio = field
            .content_type()
            .is_some_and(|mime| mime.essence_str().starts_with("audio/"));
        if !is_audio {
            return Err(AppError::InvalidInput("invalid_audio_type".to_string()));
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(malformed)?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::InvalidInput(format!(
                    "audio file too large (max: {} bytes)",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(AudioUpload { bytes, filename });
    }

    Err(AppError::InvalidInput("missing audio file field".to_string()))
}

fn malformed(err: actix_multipart::MultipartError) -> AppError {
    AppError::InvalidInput(format!("malformed multipart body: {}", err))
}
