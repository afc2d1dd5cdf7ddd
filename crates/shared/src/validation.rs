use crate::constants::*;

pub fn validate_id(field: &str, id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

/// Empty content is allowed here; only the upper bound is enforced.
pub fn validate_message_content(content: &str) -> Result<(), String> {
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_content_type(content_type: &str) -> Result<(), String> {
    if !CONTENT_TYPES.contains(&content_type) {
        return Err(format!("Unknown content type '{}'", content_type));
    }
    Ok(())
}

pub fn validate_media_url(url: &str) -> Result<(), String> {
    if url.len() > MAX_MEDIA_URL_LENGTH {
        return Err("Media URL too long".into());
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err("Media URL must be http(s)".into());
    }
    Ok(())
}

pub fn validate_group_title(title: &str) -> Result<(), String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Group title cannot be blank".into());
    }
    if trimmed.chars().count() > MAX_GROUP_TITLE_LENGTH {
        return Err(format!(
            "Group title must be at most {} characters",
            MAX_GROUP_TITLE_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_group_members(member_count: usize) -> Result<(), String> {
    if member_count == 0 {
        return Err("A group needs at least one other member".into());
    }
    if member_count > MAX_GROUP_MEMBERS {
        return Err(format!(
            "A group can have at most {} members",
            MAX_GROUP_MEMBERS
        ));
    }
    Ok(())
}
