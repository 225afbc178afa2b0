// Prompt text for one-pager generation and refinement.

use crate::content::BrandKit;

/// Shared system prompt. Enforces JSON-only output.
pub const SYSTEM: &str = "You are an expert marketing one-pager designer. \
    Your role is to generate structured JSON layouts for professional marketing materials.\n\n\
    IMPORTANT RULES:\n\
    1. Always respond with valid JSON only - no other text\n\
    2. Use the exact JSON schema provided\n\
    3. Keep content concise and marketing-focused\n\
    4. Include 4-6 main sections maximum\n\
    5. Use clear, benefit-driven headlines\n\
    6. Make the layout scannable and visual\n\n\
    Your output must be parseable JSON that follows the schema exactly.";

/// Layout schema shown to the model. Section types beyond these four are accepted
/// when the model offers them (hero, cta, features, testimonials, image, footer).
const LAYOUT_SCHEMA: &str = r#"{
  "headline": "Main attention-grabbing headline (10-15 words max)",
  "subheadline": "Supporting subheadline (15-25 words max)",
  "sections": [
    {"id": "section-1", "type": "heading", "content": "Section title", "order": 1},
    {"id": "section-2", "type": "text", "content": "Benefits-focused body text (2-3 sentences)", "order": 2},
    {"id": "section-3", "type": "list", "content": ["Key point 1", "Key point 2", "Key point 3"], "order": 3},
    {"id": "section-4", "type": "button", "content": "Call-to-action text", "order": 4}
  ]
}"#;

/// Prompt for the first draft of a one-pager.
pub fn generation_prompt(
    user_prompt: &str,
    brand: Option<&BrandKit>,
    target_audience: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Generate a marketing one-pager layout based on this request:\n\nUSER REQUEST: {user_prompt}\n"
    );

    if let Some(brand) = brand {
        let voice = brand
            .brand_voice
            .as_deref()
            .unwrap_or("Professional and clear");
        prompt.push_str(&format!(
            "\nBRAND CONTEXT:\n- Company: {}\n- Brand Voice: {voice}\n- Primary Color: {}\n\n\
             TONE & STYLE GUIDANCE:\n\
             - Write all content in a tone that matches: \"{voice}\"\n\
             - Ensure headlines, body text, and CTAs reflect this brand voice\n",
            brand.company_name, brand.color_palette.primary
        ));
    }

    let audience = target_audience
        .map(str::to_string)
        .or_else(|| brand.and_then(BrandKit::audience_summary));
    if let Some(audience) = audience {
        prompt.push_str(&format!("\nTARGET AUDIENCE: {audience}\n"));
    }

    prompt.push_str(&format!(
        "\nGenerate a JSON wireframe with this EXACT schema:\n{LAYOUT_SCHEMA}\n\nGenerate ONLY the JSON, no other text."
    ));
    prompt
}

/// Prompt for refining an existing one-pager. `current_json` is the serialized content.
pub fn refinement_prompt(current_json: &str, feedback: &str, brand_voice: Option<&str>) -> String {
    let voice = brand_voice
        .map(|v| {
            format!(
                "\n\nBRAND VOICE: {v}\n- Maintain this brand voice in all content modifications"
            )
        })
        .unwrap_or_default();

    format!(
        "Refine this marketing one-pager based on user feedback:\n\n\
         CURRENT LAYOUT:\n{current_json}\n\n\
         USER FEEDBACK: {feedback}{voice}\n\n\
         Modify the layout to address the feedback while maintaining the JSON schema.\n\
         Return the COMPLETE updated JSON structure with all sections, not just the changes.\n\n\
         Return ONLY valid JSON, no other text."
    )
}
