//! Category display formatting

use crate::models::Category;

use super::truncate;

/// Format one registry as a table
pub fn format_category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.\n".to_string();
    }

    let name_width = categories
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(4)
        .clamp(4, 30);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<name_width$}  {:<7}  {}\n",
        "ID",
        "Name",
        "Color",
        "Description",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<name_width$}  {:-<7}  {:-<20}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for category in categories {
        output.push_str(&format!(
            "{:<12}  {:<name_width$}  {:<7}  {}\n",
            category.id.to_string(),
            truncate(&category.name, name_width),
            category.color,
            truncate(&category.description, 40),
            name_width = name_width,
        ));
    }

    output
}
