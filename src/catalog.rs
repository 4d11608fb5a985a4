/// A subject taught in a given academic year and its contribution to the
/// credit-weighted percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectDefinition {
    pub name: &'static str,
    pub column_key: &'static str,
    pub csv_label: &'static str,
    pub credit_weight: u32,
}

impl SubjectDefinition {
    const fn new(
        name: &'static str,
        column_key: &'static str,
        csv_label: &'static str,
        credit_weight: u32,
    ) -> Self {
        Self {
            name,
            column_key,
            csv_label,
            credit_weight,
        }
    }

    pub fn score_column(&self, year: u32) -> String {
        format!("{}_y{}_score", self.column_key, year)
    }

    pub fn credit_column(&self, year: u32) -> String {
        format!("{}_y{}_credit", self.column_key, year)
    }

    /// Header used for this subject in bulk spreadsheets, e.g. `Maths_Y1_Score`.
    pub fn csv_column(&self, year: u32) -> String {
        format!("{}_Y{}_Score", self.csv_label, year)
    }
}

pub const FIRST_YEAR: u32 = 1;

const YEAR_1: [SubjectDefinition; 5] = [
    SubjectDefinition::new("Mathematics", "maths", "Maths", 4),
    SubjectDefinition::new("Physics", "physics", "Physics", 3),
    SubjectDefinition::new("Chemistry", "chemistry", "Chemistry", 3),
    SubjectDefinition::new("English", "english", "English", 3),
    SubjectDefinition::new("Computer", "computer", "Computer", 3),
];

const YEAR_2: [SubjectDefinition; 5] = [
    SubjectDefinition::new("Data Structures", "data_structures", "Data Structures", 4),
    SubjectDefinition::new("Mathematics", "maths", "Maths", 4),
    SubjectDefinition::new("Python Programming", "python", "Python Programming", 4),
    SubjectDefinition::new("Operating Systems", "os", "Operating Systems", 3),
    SubjectDefinition::new("Computer Networks", "networks", "Computer Networks", 3),
];

const YEAR_3: [SubjectDefinition; 5] = [
    SubjectDefinition::new("Machine Learning", "ml", "Machine Learning", 4),
    SubjectDefinition::new("DBMS", "dbms", "DBMS", 4),
    SubjectDefinition::new("Web Technologies", "web_tech", "Web Technologies", 3),
    SubjectDefinition::new("Probability", "probability", "Probability", 3),
    SubjectDefinition::new("AI Basics", "ai_basics", "AI Basics", 3),
];

const YEAR_4: [SubjectDefinition; 5] = [
    SubjectDefinition::new("Deep Learning", "deep_learning", "Deep Learning", 4),
    SubjectDefinition::new("AI Ethics", "ai_ethics", "AI Ethics", 3),
    SubjectDefinition::new("Cloud Computing", "cloud_computing", "Cloud Computing", 4),
    SubjectDefinition::new("NLP", "nlp", "NLP", 3),
    SubjectDefinition::new("Capstone Project", "capstone", "Capstone Project", 6),
];

pub fn subjects_for_year(year: u32) -> Option<&'static [SubjectDefinition]> {
    match year {
        1 => Some(&YEAR_1),
        2 => Some(&YEAR_2),
        3 => Some(&YEAR_3),
        4 => Some(&YEAR_4),
        _ => None,
    }
}

pub fn attendance_columns(year: u32) -> (String, String) {
    (
        format!("Attendance_Y{year}_S1"),
        format!("Attendance_Y{year}_S2"),
    )
}
