use super::record::HEALTHY_PLANT;

/// Build the instruction sent alongside the image.
///
/// Only `language` varies; the JSON shape requested here is the one
/// [`super::normalizer`] validates.
pub fn diagnosis_prompt(language: &str) -> String {
    format!(
        r#"You are an expert agricultural AI assistant. Analyze this plant image and provide a diagnosis in {language}.

Look for signs of:
- Plant diseases (fungal, bacterial, viral)
- Pest damage
- Nutrient deficiencies
- Environmental stress
- Overall plant health

Return your response as a JSON object with this exact structure:
{{
    "disease_name": "Name of the disease or '{healthy}' if no issues found",
    "description": "Brief explanation of what you observe and the likely cause.",
    "symptoms": ["List of observed symptoms, e.g., 'Yellow spots on leaves', 'Wilting stems'"],
    "treatment": "A single string containing 3-5 actionable treatment steps, separated by newlines (\n).",
    "prevention": "A single string containing 2-3 actionable prevention tips, separated by newlines (\n).",
    "confidence": 0.85
}}

Guidelines:
- If the plant looks healthy, use "{healthy}" as disease_name and provide tips for keeping it healthy.
- Keep descriptions and recommendations simple and practical for farmers.
- Ensure 'treatment' and 'prevention' are single strings with steps separated by newlines.
- 'symptoms' must be an array of strings.
- 'confidence' should be a float between 0.0 and 1.0.
- If you are unsure, lower the confidence and suggest consulting an expert.
- Focus on organic and accessible treatments when possible.
"#,
        healthy = HEALTHY_PLANT,
    )
}
