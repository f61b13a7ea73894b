use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One fixed dimension of journalistic quality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub id: u8,
    pub name: String,
    pub rubric: String,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Criterion catalog is empty")]
    Empty,

    #[error("Duplicate criterion id: {0}")]
    DuplicateId(u8),

    #[error("Criterion id {0} is outside 1..=10")]
    IdOutOfRange(u8),
}

/// Immutable, injected set of evaluation criteria. Built once at startup
/// and passed by value; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionCatalog {
    criteria: Vec<Criterion>,
}

impl CriterionCatalog {
    /// Validate a user-supplied catalog: ids unique and within range.
    pub fn new(criteria: Vec<Criterion>) -> Result<Self, CatalogError> {
        if criteria.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = std::collections::HashSet::new();
        for criterion in &criteria {
            if !(1..=10).contains(&criterion.id) {
                return Err(CatalogError::IdOutOfRange(criterion.id));
            }
            if !seen.insert(criterion.id) {
                return Err(CatalogError::DuplicateId(criterion.id));
            }
        }
        Ok(Self { criteria })
    }

    /// The standard ten-criterion catalog for Spanish-language news.
    pub fn standard() -> Self {
        let criteria = [
            (
                1,
                "Citación de fuentes",
                "La noticia debe atribuir los datos y declaraciones a fuentes \
                 identificables y pertinentes. Se valora la presencia de fuentes \
                 primarias, su diversidad y que ninguna afirmación relevante quede \
                 sin atribución.",
            ),
            (
                2,
                "Contraste y verificación",
                "Las afirmaciones centrales deben estar contrastadas con más de una \
                 fuente o con datos verificables. Una afirmación sin contraste \
                 presentada como hecho resta calidad informativa.",
            ),
            (
                3,
                "Separación de información y opinión",
                "El relato no debe incorporar valoraciones del periodista presentadas \
                 como hechos. Las interpretaciones explícitas sin fundamento en los \
                 datos de la realidad desinforman al público.",
            ),
            (
                4,
                "Contextualización",
                "La noticia debe aportar los antecedentes y el contexto necesarios \
                 para la comprensión del acontecimiento. Datos ciertos pero \
                 insuficientes impiden una contextualización adecuada.",
            ),
            (
                5,
                "Precisión de los datos",
                "Cifras, fechas, nombres y cargos deben ser exactos, coherentes entre \
                 sí y coherentes con las fuentes citadas.",
            ),
            (
                6,
                "Relevancia informativa",
                "Los datos y declaraciones recogidos deben ser relevantes para la \
                 comprensión del acontecimiento; la información irrelevante \
                 descontextualiza y deforma la relevancia del relato.",
            ),
            (
                7,
                "Pluralidad de perspectivas",
                "Cuando hay partes en conflicto, la noticia debe recoger las versiones \
                 de las distintas partes implicadas, sin silenciar ninguna posición \
                 pertinente.",
            ),
            (
                8,
                "Orden y claridad del relato",
                "La estructura debe ofrecer un relato ordenado y comprensible del \
                 acontecimiento, sin saltos ni ambigüedades que dificulten la \
                 comprensión.",
            ),
            (
                9,
                "Uso riguroso del lenguaje",
                "Las palabras deben seleccionarse rigurosa y meticulosamente, evitando \
                 redundancias, términos inapropiados y adjetivos descalificativos sin \
                 justificación.",
            ),
            (
                10,
                "Coherencia entre titular y cuerpo",
                "El titular debe corresponderse con el contenido del cuerpo de la \
                 noticia, sin prometer información que no aparece ni exagerar lo que \
                 aparece.",
            ),
        ];

        Self {
            criteria: criteria
                .into_iter()
                .map(|(id, name, rubric)| Criterion {
                    id,
                    name: name.to_string(),
                    rubric: rubric.to_string(),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.criteria.iter().map(|c| c.id)
    }
}
