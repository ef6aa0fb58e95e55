//! crates/fiche_core/src/render.rs
//!
//! Renders a sheet as the HTML preview document that every exporter consumes.

use crate::domain::Sheet;
use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Senegal keeps UTC+0 all year, with no daylight saving.
pub const SCHOOL_UTC_OFFSET_SECS: i32 = 0;

/// Layout shared by the preview, print and PDF documents.
pub const PREVIEW_CSS: &str = r#"
@page { size: A4 portrait; margin: 0; }
body { margin: 0; font-family: Arial, "Noto Naskh Arabic", "Times New Roman", sans-serif; font-size: 10.5pt; color: #111; }
.fiche { box-sizing: border-box; width: 210mm; min-height: 297mm; padding: 10mm 12mm; }
.fiche[dir="rtl"] { text-align: right; }
.entete { display: flex; justify-content: space-between; border-bottom: 2px solid #000; padding-bottom: 4mm; }
.entete p { margin: 0 0 1mm 0; }
.titre { text-align: center; font-size: 15pt; font-weight: bold; margin: 4mm 0 1mm 0; }
.type { text-align: center; text-transform: uppercase; letter-spacing: 0.1em; margin-bottom: 4mm; }
table { border-collapse: collapse; width: 100%; margin-bottom: 4mm; }
th, td { border: 1px solid #000; padding: 1.5mm 2mm; vertical-align: top; }
th { background: #f0f0f0; text-align: left; }
.libelle { font-weight: bold; width: 28%; }
.signatures { display: flex; justify-content: space-between; margin-top: 8mm; }
footer { text-align: center; font-size: 8pt; color: #555; margin-top: 6mm; }
@media print { .no-print { display: none; } }
"#;

/// True when the sheet is written in Arabic script and reads right to left.
pub fn is_right_to_left(sheet: &Sheet) -> bool {
    contains_arabic(&sheet.title) || contains_arabic(&sheet.competence)
}

fn contains_arabic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

/// Escapes text for HTML and keeps its line breaks.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

fn row(label: &str, value: &str) -> String {
    format!(
        "<tr><td class=\"libelle\">{}</td><td>{}</td></tr>",
        label,
        escape(value)
    )
}

/// The calendar date of `at` in the school's time zone, as `dd/mm/yyyy`.
pub fn school_date(at: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(SCHOOL_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset).format("%d/%m/%Y").to_string()
}

/// The preview markup of a sheet: one `div.fiche`, without `<html>` wrapping.
pub fn render_preview(sheet: &Sheet) -> String {
    let dir = if is_right_to_left(sheet) { "rtl" } else { "ltr" };
    let mut html = String::with_capacity(8 * 1024);

    html.push_str(&format!("<div class=\"fiche\" dir=\"{}\">", dir));

    html.push_str("<div class=\"entete\"><div>");
    html.push_str("<p><strong>République du Sénégal</strong></p>");
    html.push_str("<p>Ministère de l'Éducation Nationale</p>");
    html.push_str("<p>Inspection de l'Éducation : .........................</p>");
    html.push_str("<p>École : ...........................................</p>");
    html.push_str("</div><div>");
    html.push_str(&format!("<p>Classe : <strong>{}</strong></p>", sheet.grade_level));
    html.push_str("<p>Effectif : ........... G : .... F : ....</p>");
    html.push_str(&format!(
        "<p>Date : {}</p>",
        school_date(sheet.created_at)
    ));
    html.push_str("</div></div>");

    html.push_str(&format!("<div class=\"titre\">{}</div>", escape(&sheet.title)));
    html.push_str(&format!("<div class=\"type\">{}</div>", sheet.sheet_type.label()));

    // Curriculum frame
    html.push_str("<table><tbody>");
    html.push_str(&row("Domaine", &sheet.domain));
    html.push_str(&row("Sous-domaine", &sheet.sub_domain));
    if let Some(discipline) = &sheet.discipline {
        html.push_str(&row("Discipline", discipline));
    }
    html.push_str(&row("Activité", &sheet.subject));
    html.push_str(&row("Compétence de base (CB)", &sheet.competence));
    html.push_str(&row("Palier", &sheet.level));
    html.push_str(&row("Objectif d'apprentissage (OA)", &sheet.oa));
    html.push_str(&row("Objectif spécifique (OS)", &sheet.specific_objective));
    html.push_str("</tbody></table>");

    // Inputs
    html.push_str("<table><tbody>");
    html.push_str(&row("Matériel collectif", &sheet.material.collective));
    html.push_str(&row("Matériel individuel", &sheet.material.individual));
    html.push_str(&row("Durée", &sheet.duration));
    html.push_str(&row("Documentation", &sheet.reference));
    html.push_str("</tbody></table>");

    html.push_str("<table><thead><tr>");
    html.push_str("<th>Étapes</th><th>Objectifs</th>");
    html.push_str("<th>Activités de l'enseignant</th><th>Activités des élèves</th>");
    html.push_str("</tr></thead><tbody>");
    for step in &sheet.steps {
        html.push_str(&format!(
            "<tr><td><strong>{}</strong></td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&step.name),
            escape(&step.objective),
            escape(&step.teacher_activity),
            escape(&step.student_activity),
        ));
    }
    html.push_str("</tbody></table>");

    if !sheet.content_summary.trim().is_empty() {
        html.push_str("<table><tbody>");
        html.push_str(&row("Trace écrite", &sheet.content_summary));
        html.push_str("</tbody></table>");
    }

    html.push_str("<table><tbody>");
    html.push_str("<tr><td class=\"libelle\">Observations</td><td><br><br><br></td></tr>");
    html.push_str("</tbody></table>");

    html.push_str("<div class=\"signatures\">");
    html.push_str("<span>Signature du maître</span><span>Visa du directeur</span>");
    html.push_str("</div>");
    html.push_str("<footer>FichesGen • Guide pédagogique numérique du Sénégal</footer>");
    html.push_str("</div>");
    html
}

/// Wraps the preview in a complete HTML document.
pub fn standalone_document(sheet: &Sheet, extra_head: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"fr\"><head><meta charset=\"utf-8\">\
         <title>{}</title><style>{}</style>{}</head><body>{}</body></html>",
        escape(&sheet.title),
        PREVIEW_CSS,
        extra_head,
        render_preview(sheet)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GradeLevel, Material, SheetId, SheetType, Step};
    use chrono::{TimeZone, Utc};

    fn sheet() -> Sheet {
        Sheet {
            id: SheetId::from("s1"),
            title: "Les fractions <simples>".to_string(),
            discipline: None,
            subject: "Activités numériques".to_string(),
            domain: "Mathématiques".to_string(),
            sub_domain: "Numération".to_string(),
            grade_level: GradeLevel::Ce2,
            competence: "Résoudre des problèmes".to_string(),
            level: "Palier 1".to_string(),
            oa: "Comprendre les fractions".to_string(),
            content_summary: "Une fraction a un numérateur\net un dénominateur.".to_string(),
            specific_objective: "Lire 1/2 et 1/4".to_string(),
            sheet_type: SheetType::Exercise,
            duration: "30 min".to_string(),
            material: Material {
                collective: "Tableau".to_string(),
                individual: "Ardoises".to_string(),
            },
            reference: "Guide CE2".to_string(),
            steps: vec![
                Step {
                    name: "Mise en train".to_string(),
                    objective: "Réviser".to_string(),
                    teacher_activity: "Pose des questions".to_string(),
                    student_activity: "Répondent".to_string(),
                },
                Step {
                    name: "Évaluation".to_string(),
                    objective: "Vérifier".to_string(),
                    teacher_activity: "Distribue l'exercice".to_string(),
                    student_activity: "Résolvent".to_string(),
                },
            ],
            created_at: Utc.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn preview_escapes_and_orders_steps() {
        let html = render_preview(&sheet());
        assert!(html.contains("Les fractions &lt;simples&gt;"));
        assert!(html.contains("numérateur<br>et"));
        assert!(html.contains("Date : 07/03/2024"));
        assert!(html.contains("Exercices"));
        let first = html.find("Mise en train").unwrap();
        let last = html.find("Distribue l&#39;exercice").unwrap();
        assert!(first < last);
        assert!(html.contains("dir=\"ltr\""));
    }

    #[test]
    fn date_follows_the_school_calendar_day() {
        let late_evening = Utc.with_ymd_and_hms(2023, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(school_date(late_evening), "31/12/2023");

        let mut sheet = sheet();
        sheet.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 15, 0).unwrap();
        assert!(render_preview(&sheet).contains("Date : 01/03/2024"));
    }

    #[test]
    fn arabic_title_switches_to_right_to_left() {
        let mut sheet = sheet();
        sheet.title = "Le pluriel / الجمع".to_string();
        assert!(is_right_to_left(&sheet));
        assert!(render_preview(&sheet).contains("dir=\"rtl\""));
    }

    #[test]
    fn discipline_row_only_when_present() {
        let mut sheet = sheet();
        assert!(!render_preview(&sheet).contains("Discipline"));
        sheet.discipline = Some("Mathématiques".to_string());
        assert!(render_preview(&sheet).contains("Discipline"));
    }
}
