//! Instruction templates sent to the inference model.
//!
//! Every prompt lives here so the wording can be changed in one place and
//! inspected by unit tests without a model. Content is interpolated
//! verbatim: no escaping is applied to chunk text or image payloads.

/// Instruction block for image inputs. The base64 payload is appended after
/// the `Image Content (Base64)` heading by [`image_prompt`].
pub const IMAGE_INSTRUCTIONS: &str = r#"Generate a list of keywords based on the content of the following image. Use the filename to identify the subject of the image and include it in the list.

**Requirements:**
1. The image is related to university-level computer science.
2. The keywords should be in English and consist of computer science or mathematics terms only.
3. Include possible subject names like mathematics or computer science if relevant.
4. If the image appears exam-related, include the term exam.
5. Avoid adding terms not visible or explicitly depicted in the image. Be highly selective and avoid assumptions.
6. The output should be a comma-separated list of likely terms, ordered by relevance.
7. Do not add any additional text or context—just the keywords.

**Image Content (Base64):**"#;

/// Instruction appended after a document chunk by [`text_prompt`].
pub const TEXT_INSTRUCTIONS: &str = r#"get keywords from the above content. keywords shall be from cs and maths fields.
return only the list of keywords.
... return the keywords one after another with commas on a single line"#;

/// Build the prompt for a single image.
pub fn image_prompt(image_base64: &str) -> String {
    format!("{IMAGE_INSTRUCTIONS}\n{image_base64}\n")
}

/// Build the prompt for a single document chunk.
pub fn text_prompt(chunk: &str) -> String {
    format!("{chunk}\n{TEXT_INSTRUCTIONS}\n")
}
