//! # Label Parsing Examples
//!
//! This example runs the label parser over a few typical OCR transcriptions and
//! shows what was found, and how.

use nutrilabel::label_parser::NutritionLabelParser;
use nutrilabel::nutrition_types::MacroKey;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let parser = NutritionLabelParser::new()?;

    let labels = [
        (
            "Italian table",
            "VALORI NUTRIZIONALI\nPer 100 g\nEnergia 1046 kJ / 250 kcal\nGrassi 10 g\ndi cui acidi grassi saturi 2 g\nCarboidrati 30,5 g\ndi cui zuccheri 12 g\nProteine 5 g",
        ),
        (
            "Split rows",
            "Carboidrati\ndi cui zuccheri 5 g\n12 g\nProteine: 3 g",
        ),
        (
            "English, split energy",
            "Nutrition information\nper 100ml\nEnergy\nkcal\n68.0\nFat 0.3 g\nCarbohydrate 1 g\nProtein 0.1 g",
        ),
        (
            "No nutrition table",
            "Ingredienti: farina di grano tenero, zucchero, burro",
        ),
    ];

    for (title, text) in labels {
        println!("🔍 {title}");

        let extraction = parser.extract(text);
        for key in [
            MacroKey::Carbohydrates,
            MacroKey::Protein,
            MacroKey::Fat,
            MacroKey::Calories,
        ] {
            match extraction.get(key) {
                Some(found) => println!("  • {key}: {} ({:?})", found.value, found.strategy),
                None => println!("  • {key}: not found"),
            }
        }

        let result = parser.parse(text);
        println!("  name guess: '{}'", result.name_guess);
        println!("  confidence: {}", result.confidence);
        println!("  json: {}\n", serde_json::to_string(&result)?);
    }

    Ok(())
}
