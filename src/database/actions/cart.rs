use std::collections::BTreeMap;

use sqlx::{Pool, Postgres};

use crate::{
    constants::SHOPPING_LIST_HEADER,
    error::Error,
    schema::{CartIngredient, RecipeSummary, ShoppingLine},
};

use super::get_recipe;

pub async fn cart_size(user_id: i32, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_shopping_cart WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

pub async fn add_to_cart(
    recipe_id: i32,
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or(Error::NotFound("recipe"))?;

    let result =
        sqlx::query("INSERT INTO user_shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadyExists("cart entry"));
    }

    Ok(RecipeSummary::from(recipe))
}

pub async fn remove_from_cart(
    recipe_id: i32,
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM user_shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("cart entry"));
    }

    Ok(())
}

/// Builds the deduplicated shopping list for everything in the user's cart.
pub async fn build_shopping_list(
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingLine>, Error> {
    let cart_size = cart_size(user_id, pool).await?;

    let rows: Vec<CartIngredient> = if cart_size == 0 {
        Vec::new()
    } else {
        sqlx::query_as(
            "
            SELECT i.name, i.measurement_unit, ri.amount
            FROM user_shopping_cart c
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
        ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?
    };

    shopping_list_from(cart_size, rows)
}

/// An empty cart is an error, not a zero-line report.
pub fn shopping_list_from(
    cart_size: i64,
    rows: Vec<CartIngredient>,
) -> Result<Vec<ShoppingLine>, Error> {
    if cart_size == 0 {
        return Err(Error::EmptyCart);
    }

    Ok(aggregate_shopping_lines(rows))
}

/// Groups associations by the denormalized (name, unit) pair and sums the
/// amounts. Two catalog rows sharing a name and unit merge into one line on
/// purpose; grouping by ingredient id would change the observable output.
/// The BTreeMap key keeps the result ordered by name.
pub fn aggregate_shopping_lines(rows: Vec<CartIngredient>) -> Vec<ShoppingLine> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingLine {
            name,
            measurement_unit,
            total_amount,
        })
        .collect()
}

/// Renders the plain-text report: a header line, then one line per group.
pub fn render_shopping_list(lines: &[ShoppingLine]) -> String {
    let mut report = String::from(SHOPPING_LIST_HEADER);
    report.push('\n');

    for line in lines {
        report.push_str(&format!(
            "- {} - {} {}\n",
            line.name, line.total_amount, line.measurement_unit
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> CartIngredient {
        CartIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_the_same_ingredient_across_recipes() {
        // Recipe A: 200 g flour; recipe B: 100 g flour + 50 g sugar.
        let lines = aggregate_shopping_lines(vec![
            row("flour", "g", 200),
            row("flour", "g", 100),
            row("sugar", "g", 50),
        ]);

        assert_eq!(
            lines,
            vec![
                ShoppingLine {
                    name: String::from("flour"),
                    measurement_unit: String::from("g"),
                    total_amount: 300,
                },
                ShoppingLine {
                    name: String::from("sugar"),
                    measurement_unit: String::from("g"),
                    total_amount: 50,
                },
            ]
        );
    }

    #[test]
    fn groups_by_name_and_unit_not_by_id() {
        let lines = aggregate_shopping_lines(vec![
            row("milk", "ml", 200),
            row("milk", "tbsp", 2),
            row("milk", "ml", 300),
        ]);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].measurement_unit, "ml");
        assert_eq!(lines[0].total_amount, 500);
        assert_eq!(lines[1].measurement_unit, "tbsp");
        assert_eq!(lines[1].total_amount, 2);
    }

    #[test]
    fn output_is_sorted_by_name() {
        let lines = aggregate_shopping_lines(vec![
            row("zucchini", "pcs", 1),
            row("apple", "pcs", 3),
            row("flour", "g", 100),
        ]);

        let names: Vec<&str> = lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "flour", "zucchini"]);
    }

    #[test]
    fn empty_cart_is_an_error_not_an_empty_report() {
        assert!(matches!(
            shopping_list_from(0, vec![]),
            Err(Error::EmptyCart)
        ));
    }

    #[test]
    fn non_empty_cart_aggregates_its_rows() {
        let lines = shopping_list_from(2, vec![row("flour", "g", 200), row("flour", "g", 100)])
            .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].total_amount, 300);
    }

    #[test]
    fn report_has_header_and_one_line_per_group() {
        let lines = aggregate_shopping_lines(vec![
            row("flour", "g", 200),
            row("flour", "g", 100),
            row("sugar", "g", 50),
        ]);

        let report = render_shopping_list(&lines);
        assert_eq!(report, "Shopping list:\n- flour - 300 g\n- sugar - 50 g\n");
    }
}
