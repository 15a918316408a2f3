//! User-editable prompt template with `{question}` and `{context}` slots

use regex::{Captures, Regex};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is missing the {{{0}}} slot")]
    MissingSlot(&'static str),

    #[error("template uses unknown slot {{{0}}}; only {{question}} and {{context}} are filled")]
    UnknownSlot(String),
}

const QUESTION: &str = "question";
const CONTEXT: &str = "context";

/// Default assistant prompt (IARIS, impact consulting for organisation managers)
pub const DEFAULT_TEMPLATE: &str = r#"Você é a IARIS, uma IA assistente especializada em negócios de impacto socioambiental positivo que existe para apoiar gestores de instituições, ONGs e negócios com fins lucrativos a atuarem de forma eficiente a favor de impacto socioambiental positivo.

Seu objetivo é fornecer insights práticos, estratégias e ferramentas para melhorar a gestão de suas organizações, sempre com foco em gerar e ampliar impactos positivos para a sociedade e o meio ambiente.

Você conversa com gestores de diferentes tipos de instituições como empresas privadas, organizações sem fins lucrativos, fundações e institutos, empresas do sistema B, empresas e órgãos públicos. Sua linguagem deve ser clara, acessível e adaptável ao nível de conhecimento do gestor, sem ser formal demais nem informal demais.

Sempre que possível, forneça exemplos práticos, cases de sucesso e referências confiáveis (frameworks globais, estudos acadêmicos ou boas práticas de organizações reconhecidas).

Interesses que os gestores têm ao te procurar:

* Teoria da Mudança
* Monitoramento e mensuração de impacto social e/ou ambiental positivo
* Produção de relatório de sustentabilidade
* Mapeamento e engajamento de stakeholders

# Sobre a estrutura das suas respostas
Suas respostas devem sempre conter cinco partes conectadas entre si de forma lógica:
1. Introdução amigável e contextualizada: breve cumprimento e referência direta à pergunta do gestor.
2. Explicação clara e adaptada: resposta direta e alinhada à pergunta.
3. Detalhamento com exemplos e orientações: use bullet points para exemplos, casos de sucesso ou orientações práticas.
4. Resumo conciso: destaque os pontos principais em até 300 caracteres.
5. Fonte: discrimine as fontes utilizadas. Depois, coloque-se à disposição e faça uma pergunta relevante para manter o diálogo.

## O usuário te perguntou: "{question}"
## Você deve responder baseado no seguinte documento: "{context}"
"#;

/// Matches `{{`, `}}` and `{identifier}` in one pass
fn slot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("slot pattern is valid")
    })
}

/// A validated prompt template.
///
/// Slots are checked when the template is built, so rendering cannot fail.
/// `{{` and `}}` produce literal braces; braces around anything that is not
/// an identifier (JSON examples, for instance) are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Result<Self, TemplateError> {
        let text = text.into();

        let mut has_question = false;
        let mut has_context = false;
        for caps in slot_pattern().captures_iter(&text) {
            let Some(name) = caps.get(1) else { continue };
            match name.as_str() {
                QUESTION => has_question = true,
                CONTEXT => has_context = true,
                other => return Err(TemplateError::UnknownSlot(other.to_string())),
            }
        }

        if !has_question {
            return Err(TemplateError::MissingSlot(QUESTION));
        }
        if !has_context {
            return Err(TemplateError::MissingSlot(CONTEXT));
        }

        Ok(Self { text })
    }

    /// Substitute the slots. Inserted values are never scanned for slots.
    pub fn render(&self, question: &str, context: &str) -> String {
        slot_pattern()
            .replace_all(&self.text, |caps: &Captures| match caps.get(1) {
                Some(name) if name.as_str() == QUESTION => question.to_string(),
                Some(_) => context.to_string(),
                None => caps[0][..1].to_string(),
            })
            .into_owned()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_is_valid() {
        let template = PromptTemplate::new(DEFAULT_TEMPLATE).unwrap();
        assert_eq!(template, PromptTemplate::default());
    }

    #[test]
    fn test_missing_slots() {
        assert_eq!(
            PromptTemplate::new("Contexto: {context}"),
            Err(TemplateError::MissingSlot("question"))
        );
        assert_eq!(
            PromptTemplate::new("Pergunta: {question}"),
            Err(TemplateError::MissingSlot("context"))
        );
    }

    #[test]
    fn test_unknown_slot() {
        assert_eq!(
            PromptTemplate::new("{question} {context} {persona}"),
            Err(TemplateError::UnknownSlot("persona".to_string()))
        );
    }

    #[test]
    fn test_render() {
        let template = PromptTemplate::new("Q: {question}\nC: {context}\nQ again: {question}").unwrap();
        assert_eq!(
            template.render("Q1", "ctx"),
            "Q: Q1\nC: ctx\nQ again: Q1"
        );
    }

    #[test]
    fn test_inserted_values_are_not_rescanned() {
        let template = PromptTemplate::new("{question}|{context}").unwrap();
        assert_eq!(
            template.render("{context}", "{question}"),
            "{context}|{question}"
        );
    }

    #[test]
    fn test_escaped_and_non_slot_braces() {
        let template =
            PromptTemplate::new(r#"{{literal}} {"formato": 1} {question} {context}"#).unwrap();
        assert_eq!(
            template.render("q", "c"),
            r#"{literal} {"formato": 1} q c"#
        );
    }

    #[test]
    fn test_escaped_slot_does_not_count() {
        assert_eq!(
            PromptTemplate::new("{{question}} {context}"),
            Err(TemplateError::MissingSlot("question"))
        );
    }
}
