/// Prompt templates for the article-analysis loops
pub struct AnalysisPrompts;

const MAX_BODY_CHARS: usize = 12_000;

impl AnalysisPrompts {
    pub fn drafter_system() -> &'static str {
        "Eres un evaluador experto de calidad periodística. Analizas noticias en \
         español con rigor, citando siempre las partes del texto en que se basan \
         tus conclusiones. No emites juicios morales y te centras exclusivamente \
         en el carácter informativo de la noticia."
    }

    pub fn critic_system() -> &'static str {
        "Eres un revisor crítico de valoraciones periodísticas. Examinas la última \
         valoración propuesta y decides si es rigurosa y está bien fundamentada en \
         el texto de la noticia."
    }

    /// Initial qualitative judgment for one criterion
    pub fn draft(title: &str, body: &str, criterion_name: &str, rubric: &str) -> String {
        format!(
            r#"Para esta noticia:

Título: {title}

{body}

Clasifícala cualitativamente (Óptima, Positiva, Regular, Negativa, Desinformativa) según el criterio "{criterion}", en base a la siguiente instrucción, y justifica tu decisión señalando en qué partes del texto te basas para tomar estas conclusiones. Si no se señalan las partes del texto en que se basan las conclusiones la respuesta no es válida.

{rubric}

La respuesta no incluirá valoraciones interpretativas ni instrucciones de cómo debe ser una noticia. Todo juicio irá acompañado de una justificación y se centrará solamente en el carácter informativo de la noticia."#,
            title = title,
            body = truncate_text(body, MAX_BODY_CHARS),
            criterion = criterion_name,
            rubric = rubric,
        )
    }

    /// Ask the critic to settle or push back on the latest draft.
    /// `history` is the rendered transcript so far.
    pub fn critique(criterion_name: &str, rubric: &str, history: &str) -> String {
        format!(
            r#"Estás revisando la valoración de una noticia según el criterio "{criterion}":

{rubric}

Este es el historial completo del intercambio hasta ahora:

{history}

Evalúa la valoración más reciente del Drafter. Si es rigurosa, está bien fundamentada en el texto y no necesita cambios, responde indicando que la valoración queda aprobada (usa literalmente la palabra "aprobada" o "adecuada"). En caso contrario, indica de forma concreta qué debe cambiar, sin usar esas palabras."#,
            criterion = criterion_name,
            rubric = rubric,
            history = history,
        )
    }

    /// Ask the drafter for an improved version of its previous judgment
    pub fn revise(previous_draft: &str, feedback: &str) -> String {
        format!(
            r#"Tu valoración anterior fue:

{draft}

El revisor ha pedido estos cambios:

{feedback}

Escribe una versión mejorada de la valoración que atienda los cambios pedidos. Mantén las citas del texto de la noticia que fundamentan cada conclusión."#,
            draft = previous_draft,
            feedback = feedback,
        )
    }

    /// One-shot numeric scoring call, independent of the approval protocol
    pub fn score(title: &str, body: &str, final_text: &str) -> String {
        format!(
            r#"Considera la siguiente noticia:
Título: {title}
Noticia: {body}

Y la valoración final:
{final_text}

Asigna una puntuación numérica entre 1 y 100 a la calidad informativa de la noticia según este criterio, donde 1 es la más baja y 100 la más alta.
Responde únicamente con el número."#,
            title = title,
            body = truncate_text(body, MAX_BODY_CHARS),
            final_text = final_text,
        )
    }

    /// Ask for source fragments justifying each settled judgment, in a
    /// parseable line format.
    pub fn citations(title: &str, body: &str, judgments: &str) -> String {
        format!(
            r#"Para la noticia titulada '{title}':

{body}

Se han emitido estas valoraciones:

{judgments}

Justifica cada valoración citando fragmentos literales de la noticia. Responde con una línea por valoración, exactamente con este formato:

<valoración>|["<fragmento 1>"],["<fragmento 2>"]

No añadas texto fuera de esas líneas."#,
            title = title,
            body = truncate_text(body, MAX_BODY_CHARS),
            judgments = judgments,
        )
    }

    /// Summarize the ten settled judgments into one general assessment
    pub fn general_assessment(title: &str, judgments: &str) -> String {
        format!(
            r#"Para las siguientes valoraciones obtenidas:

{judgments}

Realiza una breve síntesis de lo anterior para generar una valoración general de la noticia titulada '{title}'. La valoración debe resumir los puntos clave y ser concisa."#,
            judgments = judgments,
            title = title,
        )
    }
}

/// Prompt templates for the headline-adequacy loop
pub struct HeadlinePrompts;

impl HeadlinePrompts {
    pub const RUBRIC_NAME: &'static str = "Adecuación del titular";

    pub fn rubric() -> &'static str {
        "El titular debe reflejar con fidelidad el contenido informativo, sin \
         exageraciones, omisiones engañosas ni fórmulas de clickbait que fuercen \
         el clic. Si el titular no es adecuado, además de justificarlo, propón \
         una alternativa en una línea propia con el formato exacto:\n\
         TITULO PROPUESTO: <titular alternativo>"
    }

    pub fn draft(headline: &str) -> String {
        format!(
            r#"Analiza este titular de prensa:

{headline}

{rubric}

Justifica tu análisis de forma concreta."#,
            headline = headline,
            rubric = HeadlinePrompts::rubric(),
        )
    }
}

/// Truncate at a line boundary where possible, so prompts never carry a
/// half-cut paragraph.
fn truncate_text(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    match text[..cut].rfind('\n') {
        Some(pos) => &text[..pos],
        None => &text[..cut],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_prompt_carries_title_and_rubric() {
        let prompt = AnalysisPrompts::draft(
            "Sube el paro",
            "El paro subió un 2% en marzo.",
            "Citación de fuentes",
            "La noticia debe atribuir sus datos a fuentes identificables.",
        );
        assert!(prompt.contains("Sube el paro"));
        assert!(prompt.contains("Citación de fuentes"));
        assert!(prompt.contains("fuentes identificables"));
    }

    #[test]
    fn truncation_prefers_line_boundaries() {
        let text = "primera línea\nsegunda línea\ntercera línea";
        let truncated = truncate_text(text, 20);
        assert_eq!(truncated, "primera línea");
    }

    #[test]
    fn truncation_is_utf8_safe() {
        let text = "ñ".repeat(100);
        let truncated = truncate_text(&text, 15);
        assert!(truncated.len() <= 15);
        assert!(truncated.chars().all(|c| c == 'ñ'));
    }

    #[test]
    fn headline_draft_includes_proposal_marker_instruction() {
        let prompt = HeadlinePrompts::draft("No creerás lo que pasó");
        assert!(prompt.contains("TITULO PROPUESTO:"));
    }
}
