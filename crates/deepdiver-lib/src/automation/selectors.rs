//! Candidate locator lists for the NotebookLM UI, most specific first.

use crate::browser::locator::quote_text;

/// Visible once the signed-in landing page has rendered.
pub const APP_READY: &[&str] = &[r#"button[aria-label="Create new notebook"]"#];

pub const PROFILE_INDICATORS: &[&str] = &[
    r#"button[aria-label*="Google Account"]"#,
    r#"button[data-testid="user-menu"]"#,
    ".user-avatar",
    r#"[data-cy="user-menu"]"#,
];

pub const SIGN_IN_INDICATORS: &[&str] = &[
    r#"button[data-testid="sign-in"]"#,
    r#"button:has-text("Sign in")"#,
    r#"a:has-text("Sign in")"#,
];

pub const MAIN_PAGE: &[&str] = &[r#"h2:has-text("Recent notebooks")"#];

pub const CREATE_NOTEBOOK: &[&str] = &[
    r#"button[aria-label="Create new notebook"]"#,
    r#"button:has-text("Create new notebook")"#,
    r#"button:has-text("New notebook")"#,
    r#"[data-testid="create-notebook"]"#,
    "button.create-notebook-btn",
];

/// Present inside a freshly opened notebook.
pub const NOTEBOOK_UI: &[&str] = &["mat-card.create-new-action-button"];

pub const NOTEBOOK_INDICATORS: &[&str] = &[
    "mat-card.create-new-action-button",
    r#"h2:has-text("Add sources")"#,
    r#"div[role="dialog"]"#,
    r#"button:has-text("Audio Overview")"#,
    r#"[data-testid="notebook-content"]"#,
    ".notebook-title",
    "div.sources-panel",
];

pub const NOTEBOOK_TITLE: &[&str] = &[".notebook-title", "input.title-input", "h1.notebook-title"];

pub const SOURCES_TAB: &[&str] = &[
    r#"div[role="tab"]:has-text("Sources")"#,
    r#"button[role="tab"]:has-text("Sources")"#,
];

pub const ADD_SOURCE_BUTTON: &[&str] = &[
    r#"button:has-text("Add source")"#,
    r#"button[aria-label*="Add source"]"#,
    r#"button:has-text("Add")"#,
    "mat-card.create-new-action-button",
];

/// Upload controls that only exist while the add-source surface is open.
pub const UPLOAD_SURFACE: &[&str] = &[
    "button[xapscottyuploadertrigger]",
    r#"button[aria-label="Upload sources from your computer"]"#,
];

pub const UPLOAD_TRIGGERS: &[&str] = &[
    "button[xapscottyuploadertrigger]",
    r#"button[aria-label="Upload sources from your computer"]"#,
    "mat-card.create-new-action-button",
    r#"button:has-text("Upload sources")"#,
    r#"button:has-text("Add source")"#,
    r#"input[type="file"]"#,
];

/// Hidden inputs that accept files after the upload trigger is clicked.
pub const FILE_INPUTS: &[&str] = &[r#"input[type="file"][name="Filedata"]"#, r#"input[type="file"]"#];

pub fn source_chips(label: &str) -> Vec<String> {
    let label = quote_text(label);
    vec![
        format!("mat-chip:has-text({label})"),
        format!("button:has-text({label})"),
        format!("span.mdc-evolution-chip__text-label:has-text({label})"),
    ]
}

pub const URL_INPUTS: &[&str] = &[
    r#"input[type="url"]"#,
    r#"input[placeholder*="URL"]"#,
    r#"input[placeholder*="url"]"#,
    r#"input[placeholder*="link"]"#,
    r#"input[aria-label*="URL"]"#,
    r#".mat-mdc-dialog-container input[type="text"]"#,
    ".mat-mdc-dialog-container textarea",
    "textarea",
];

pub const SUBMIT_SOURCE: &[&str] = &[
    r#"button:not([disabled]):has-text("Insert")"#,
    r#".mat-mdc-dialog-container button[type="submit"]:not([disabled])"#,
    r#".mat-mdc-dialog-container button:not([disabled]):has-text("Add")"#,
];

pub const DIALOG: &[&str] = &[".mat-mdc-dialog-container"];

/// Rows of the sources panel; one showing up acknowledges an ingest.
pub const INGEST_ACK: &[&str] = &[
    "div.single-source-container",
    ".source-stretched-button",
    r#"[data-testid="source-item"]"#,
];

pub const AUDIO_CUSTOMIZE: &[&str] = &[
    r#".create-artifact-button-container:has-text("Audio Overview") button.edit-button"#,
    r#".create-artifact-button-container:has-text("Audio Overview") .edit-button-always-visible"#,
    r#".create-artifact-button-container:has-text("Audio Overview") button[data-edit-button-type="1"]"#,
    "button.edit-button:has(mat-icon .edit-button-icon)",
    r#".mat-label-medium:has-text("Audio Overview") button.edit-button"#,
];

pub fn format_tiles(format: &str) -> Vec<String> {
    let format = quote_text(format);
    vec![
        format!(".mat-mdc-dialog-container mat-radio-button:has-text({format})"),
        format!(".mat-mdc-dialog-container .tile-label:has-text({format})"),
    ]
}

pub const LANGUAGE_SELECT: &[&str] = &[
    r#".mat-mdc-dialog-container mat-select[aria-label*="language"]"#,
    r#".mat-mdc-dialog-container mat-select[aria-label*="Language"]"#,
];

pub fn language_options(language: &str) -> Vec<String> {
    vec![format!("mat-option:has-text({})", quote_text(language))]
}

pub fn length_buttons(length: &str) -> Vec<String> {
    vec![format!(
        ".mat-mdc-dialog-container .mat-button-toggle-group button:has-text({})",
        quote_text(length)
    )]
}

pub const FOCUS_PROMPT: &[&str] = &[".mat-mdc-dialog-container textarea"];

pub const GENERATE: &[&str] = &[
    r#".mat-mdc-dialog-container button:not([disabled]):has-text("Generate")"#,
    r#"button:not([disabled]):has-text("Generate")"#,
];

/// An audio artifact that finished generating.
pub const AUDIO_READY: &[&str] = &[
    r#"artifact-library-item:has-text("Audio Overview") button[aria-label*="Play"]"#,
    r#"[data-artifact-type="audio"][data-status="complete"]"#,
    "audio-player",
    r#"button[aria-label="Play"]"#,
];

/// Attributes that may carry an artifact id, in preference order.
pub const ARTIFACT_ID_ATTRIBUTES: &[&str] = &["data-artifact-id", "data-id", "id"];

pub const ARTIFACT_TIMESTAMP: &[&str] = &[
    r#"artifact-library-item:has-text("Audio Overview") .artifact-timestamp"#,
    ".artifact-timestamp",
];

/// Containers of the artifact whose id is `id`, innermost first.
fn artifact_scopes(id: &str) -> [String; 2] {
    let attr = serde_json::to_string(id).unwrap_or_else(|_| format!("\"{id}\""));
    [
        format!("[data-artifact-id={attr}]"),
        format!("artifact-library-item:has([data-artifact-id={attr}])"),
    ]
}

/// Download controls inside one specific artifact.
pub fn artifact_downloads(id: &str) -> Vec<String> {
    artifact_scopes(id)
        .iter()
        .flat_map(|scope| {
            [
                format!(r#"{scope} button:has-text("Download")"#),
                format!("{scope} a[download]"),
            ]
        })
        .collect()
}

/// Overflow menu buttons inside one specific artifact.
pub fn artifact_menus(id: &str) -> Vec<String> {
    artifact_scopes(id)
        .iter()
        .map(|scope| format!(r#"{scope} button[aria-label*="More"]"#))
        .collect()
}

pub const DOWNLOAD: &[&str] = &[
    r#"button:has-text("Download")"#,
    r#"[role="menuitem"]:has-text("Download")"#,
    "a[download]",
    r#"[data-testid="download-button"]"#,
    ".download-button",
];

/// Overflow menus that hide the download entry.
pub const ARTIFACT_MENU: &[&str] = &[
    r#"artifact-library-item:has-text("Audio Overview") button[aria-label*="More"]"#,
    r#"button[aria-label="More options"]"#,
];

pub const SHARE_BUTTON: &[&str] = &[
    r#"button[aria-label="Share"]"#,
    r#"button:has-text("Share")"#,
    r#"button[title="Share"]"#,
    r#"[data-testid="share-button"]"#,
    "button.share-button",
];

pub const SHARE_DIALOG: &[&str] = &[
    r#"div[role="dialog"]"#,
    ".share-dialog",
    r#"[data-testid="share-dialog"]"#,
    "div.modal",
];

pub const EMAIL_INPUT: &[&str] = &[
    r#"input[type="email"]"#,
    r#"input[aria-label*="email"]"#,
    r#"input[aria-label*="Add people"]"#,
    r#"input[placeholder*="email"]"#,
    "input.share-email-input",
];

pub const ROLE_SELECT: &[&str] = &[
    r#"select[aria-label*="role"]"#,
    r#"button[aria-label*="Can edit"]"#,
    ".role-selector",
];

pub const VIEWER_OPTION: &[&str] = &[
    r#"li:has-text("Can view")"#,
    r#"button:has-text("Viewer")"#,
    r#"[data-value="viewer"]"#,
];

/// Send controls; disabled buttons never match.
pub const SEND_INVITE: &[&str] = &[
    r#"button:not([disabled]):has-text("Send")"#,
    r#"div[role="dialog"] button:not([disabled]):has-text("Share")"#,
    r#"button:not([disabled]):has-text("Invite")"#,
    r#"button[aria-label="Send"]:not([disabled])"#,
    r#"button[type="submit"]:not([disabled])"#,
];

/// Borrow a list of owned locators as the `&[&str]` the resolver takes.
pub fn as_refs(list: &[String]) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}
