pub const APP_NAME: &str = "Agora";

// Limits
pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const PREVIEW_LENGTH: usize = 50;
pub const MAX_GROUP_TITLE_LENGTH: usize = 100;
pub const MAX_GROUP_MEMBERS: usize = 50;
pub const MAX_MEDIA_URL_LENGTH: usize = 2048;

// Content types
pub const CONTENT_TYPE_TEXT: &str = "text";
pub const CONTENT_TYPE_MEDIA: &str = "media";
pub const CONTENT_TYPE_LISTING: &str = "listing";
pub const CONTENT_TYPES: [&str; 3] = [CONTENT_TYPE_TEXT, CONTENT_TYPE_MEDIA, CONTENT_TYPE_LISTING];
