use sqlx::PgPool;

use workup_common::AppError;
use workup_database::{Artisan, JobPosting};

use crate::domain::validate_request;
use crate::models::{
    ArtisanProfile, ArtisanSearchQuery, CoinBalanceResponse, DealView, RegisterArtisanRequest,
    ReviewView, UpdateArtisanRequest,
};
use crate::services::{coins, AppState};

pub struct ArtisanService {
    db_pool: PgPool,
}

impl ArtisanService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    /// Creates the artisan and, when `user_id` is given, links that login to it.
    pub async fn register(&self, request: RegisterArtisanRequest) -> Result<Artisan, AppError> {
        validate_request(&request)?;

        let mut tx = self.db_pool.begin().await?;

        if let Some(user_id) = request.user_id {
            let linked = sqlx::query_scalar::<_, Option<i32>>("SELECT artisanid FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

            if linked.is_some() {
                return Err(AppError::Conflict("User is already registered as an artisan".to_string()));
            }
        }

        let artisan = sqlx::query_as::<_, Artisan>(
            r#"
            INSERT INTO artisans
                (firstname, lastname, phone, gender, dob, city, address, skill, experience,
                 bio, profile_pic, certificate, reference, email, portfolio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(request.firstname.trim())
        .bind(request.lastname.trim())
        .bind(request.phone.trim())
        .bind(&request.gender)
        .bind(request.dob)
        .bind(request.city.trim())
        .bind(&request.address)
        .bind(request.skill.trim())
        .bind(&request.experience)
        .bind(&request.bio)
        .bind(&request.profile_pic)
        .bind(&request.certificate)
        .bind(&request.reference)
        .bind(&request.email)
        .bind(&request.portfolio)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(user_id) = request.user_id {
            sqlx::query("UPDATE users SET artisanid = $1 WHERE id = $2")
                .bind(artisan.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!("Artisan {} registered ({}, {})", artisan.id, artisan.skill, artisan.city);
        Ok(artisan)
    }

    pub async fn get_artisan(&self, artisan_id: i32) -> Result<Artisan, AppError> {
        sqlx::query_as::<_, Artisan>("SELECT * FROM artisans WHERE id = $1")
            .bind(artisan_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Artisan not found".to_string()))
    }

    pub async fn get_profile(&self, artisan_id: i32) -> Result<ArtisanProfile, AppError> {
        let artisan = self.get_artisan(artisan_id).await?;

        let job_postings = sqlx::query_as::<_, JobPosting>(
            "SELECT * FROM job_postings WHERE artisan_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(artisan_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut deals = sqlx::query_as::<_, DealView>(
            r#"
            SELECT d.id, d.user_id, d.artisan_id, d.created_at, u.first_name, u.last_name,
                   EXISTS(SELECT 1 FROM reviews r WHERE r.deal_id = d.id) AS reviewed
            FROM deals d
            JOIN users u ON u.id = d.user_id
            WHERE d.artisan_id = $1
            ORDER BY d.created_at DESC, d.id DESC
            "#,
        )
        .bind(artisan_id)
        .fetch_all(&self.db_pool)
        .await?;

        // Postings are newest first, so the first match is the latest one
        for deal in &mut deals {
            deal.job_posting = job_postings.iter().find(|p| p.deal_id == deal.id).cloned();
        }

        let reviews = sqlx::query_as::<_, ReviewView>(
            r#"
            SELECT r.*, u.first_name, u.last_name
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.artisan_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(artisan_id)
        .fetch_all(&self.db_pool)
        .await?;

        let average_rating = average_rating(reviews.iter().map(|r| r.review.rating));

        Ok(ArtisanProfile {
            artisan,
            deals,
            job_postings,
            reviews,
            average_rating,
        })
    }

    /// Updates descriptive fields only; the coin balance is not editable here.
    pub async fn update(&self, artisan_id: i32, request: UpdateArtisanRequest) -> Result<Artisan, AppError> {
        validate_request(&request)?;

        for (field, value) in [
            ("firstname", &request.firstname),
            ("lastname", &request.lastname),
            ("phone", &request.phone),
            ("city", &request.city),
            ("skill", &request.skill),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(AppError::Validation(format!("{} cannot be empty", field)));
            }
        }

        sqlx::query_as::<_, Artisan>(
            r#"
            UPDATE artisans SET
                firstname = COALESCE($2, firstname),
                lastname = COALESCE($3, lastname),
                phone = COALESCE($4, phone),
                gender = COALESCE($5, gender),
                dob = COALESCE($6, dob),
                city = COALESCE($7, city),
                address = COALESCE($8, address),
                skill = COALESCE($9, skill),
                experience = COALESCE($10, experience),
                bio = COALESCE($11, bio),
                profile_pic = COALESCE($12, profile_pic),
                certificate = COALESCE($13, certificate),
                reference = COALESCE($14, reference),
                email = COALESCE($15, email),
                portfolio = COALESCE($16, portfolio)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(artisan_id)
        .bind(request.firstname.as_deref().map(str::trim))
        .bind(request.lastname.as_deref().map(str::trim))
        .bind(request.phone.as_deref().map(str::trim))
        .bind(&request.gender)
        .bind(request.dob)
        .bind(request.city.as_deref().map(str::trim))
        .bind(&request.address)
        .bind(request.skill.as_deref().map(str::trim))
        .bind(&request.experience)
        .bind(&request.bio)
        .bind(&request.profile_pic)
        .bind(&request.certificate)
        .bind(&request.reference)
        .bind(&request.email)
        .bind(&request.portfolio)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Artisan not found".to_string()))
    }

    /// Case-insensitive substring match on skill and city. Blank filters match everything.
    pub async fn search(&self, query: ArtisanSearchQuery) -> Result<Vec<Artisan>, AppError> {
        let skill = like_pattern(query.artisan.as_deref());
        let city = like_pattern(query.city.as_deref());

        let artisans = sqlx::query_as::<_, Artisan>(
            r#"
            SELECT * FROM artisans
            WHERE ($1::text IS NULL OR skill ILIKE $1)
              AND ($2::text IS NULL OR city ILIKE $2)
            ORDER BY id
            "#,
        )
        .bind(skill)
        .bind(city)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(artisans)
    }

    pub async fn coin_balance(&self, artisan_id: i32) -> Result<CoinBalanceResponse, AppError> {
        coins::balance_with_history(&self.db_pool, artisan_id).await
    }
}

fn like_pattern(filter: Option<&str>) -> Option<String> {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty() && *f != "null" && *f != "undefined")?;
    let escaped = filter
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

fn average_rating(ratings: impl Iterator<Item = i32>) -> Option<f64> {
    let (sum, count) = ratings.fold((0i64, 0i64), |(sum, count), r| (sum + r as i64, count + 1));
    (count > 0).then(|| sum as f64 / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_filters_become_escaped_substring_patterns() {
        assert_eq!(like_pattern(Some("Plumb")), Some("%Plumb%".to_string()));
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(None), None);
        // the client sends the literal string when a query param is absent
        assert_eq!(like_pattern(Some("null")), None);
        assert_eq!(like_pattern(Some("100%_")), Some("%100\\%\\_%".to_string()));
    }

    #[test]
    fn averages_ratings() {
        assert_eq!(average_rating([].into_iter()), None);
        assert_eq!(average_rating([4, 5].into_iter()), Some(4.5));
    }
}
