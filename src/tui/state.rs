use crate::model::Phase;
use crate::upload::UploadController;

pub const TAB_UPLOAD: usize = 0;
pub const TAB_HELP: usize = 1;

pub struct TuiState {
    pub tab: usize,
    pub controller: UploadController,
    /// Status line text.
    pub info: String,
    /// Path prompt buffer; `Some` while the prompt is open.
    pub path_input: Option<String>,
    pub last_saved_path: Option<String>,
    pub health: Option<String>,
    /// Destination for automatic saves after each displayed result.
    pub auto_save_to: Option<std::path::PathBuf>,
}

impl TuiState {
    pub fn new(phase: Phase) -> Self {
        Self {
            tab: TAB_UPLOAD,
            controller: UploadController::new(phase),
            info: "Press o to open an image, or drop one onto the terminal".into(),
            path_input: None,
            last_saved_path: None,
            health: None,
            auto_save_to: None,
        }
    }
}
