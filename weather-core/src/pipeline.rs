//! Update pipeline: user query in, fully populated [`ViewState`] (or a reported error) out.
//!
//! The pipeline holds the only `watch::Sender<ViewState>`. Displayed fields are replaced as a
//! whole once both provider calls succeed; a failed query only touches `phase` and `notice`.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::{
    config::SunTimes,
    error::{AssetLoadError, QueryError},
    icons::{Bitmap, decode_condition_icon},
    model::LocationQuery,
    provider::WeatherProvider,
    recommend::{FALLBACK_RECOMMENDATION, Recommender, recommend},
    view::{Phase, ViewState},
};

pub type Clock = fn() -> DateTime<Utc>;

pub struct UpdatePipeline {
    provider: Arc<dyn WeatherProvider>,
    recommender: Arc<dyn Recommender>,
    sun_times: SunTimes,
    clock: Clock,
    view: watch::Sender<ViewState>,
    in_flight: Mutex<()>,
}

impl std::fmt::Debug for UpdatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatePipeline")
            .field("provider", &self.provider)
            .field("recommender", &self.recommender)
            .field("sun_times", &self.sun_times)
            .finish_non_exhaustive()
    }
}

impl UpdatePipeline {
    /// Returns the pipeline and the read side of its view state.
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        recommender: Arc<dyn Recommender>,
        sun_times: SunTimes,
    ) -> (Self, watch::Receiver<ViewState>) {
        let (view, rx) = watch::channel(ViewState::default());
        let pipeline = Self {
            provider,
            recommender,
            sun_times,
            clock: Utc::now,
            view,
            in_flight: Mutex::new(()),
        };
        (pipeline, rx)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn phase(&self) -> Phase {
        self.view.borrow().phase
    }

    /// Run one query to completion.
    ///
    /// Overlapping calls are refused with [`QueryError::Busy`]. A failed recommendation is
    /// replaced with [`FALLBACK_RECOMMENDATION`] and does not fail the query.
    pub async fn submit(&self, raw: &str) -> Result<Phase, QueryError> {
        let query = match LocationQuery::parse(raw) {
            Ok(query) => query,
            Err(err) => {
                // Stays in whatever phase it was in.
                self.view.send_modify(|v| v.notice = Some(err.to_string()));
                return Err(err);
            }
        };

        let _guard = self.in_flight.try_lock().map_err(|_| QueryError::Busy)?;

        self.view.send_modify(|v| {
            v.phase = Phase::Fetching;
            v.notice = None;
        });

        let weather = match self.provider.fetch_weather(&query).await {
            Ok(weather) => weather,
            Err(err) => return Err(self.fail(&query, err.into())),
        };
        let air = match self.provider.fetch_air_quality(weather.coord).await {
            Ok(air) => air,
            Err(err) => return Err(self.fail(&query, err.into())),
        };

        let mut next = ViewState::from_snapshots(&weather, &air, (self.clock)(), self.sun_times);
        next.condition_icon = self.condition_icon(&weather.icon_code).await;
        next.revision = self.view.borrow().revision + 1;
        self.view.send_replace(next);

        self.view.send_modify(|v| v.phase = Phase::Recommending);
        let recommendation = match recommend(self.recommender.as_ref(), &weather, &air).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "recommendation unavailable, using fallback");
                FALLBACK_RECOMMENDATION.to_string()
            }
        };

        self.view.send_modify(|v| {
            v.recommendation = recommendation;
            v.phase = Phase::Done;
        });

        info!(city = %weather.name, aqi = air.aqi, "dashboard updated");
        Ok(Phase::Done)
    }

    async fn condition_icon(&self, code: &str) -> Option<Arc<Bitmap>> {
        let fetched = self
            .provider
            .fetch_condition_icon(code)
            .await
            .map_err(AssetLoadError::from)
            .and_then(|bytes| decode_condition_icon(code, &bytes));

        match fetched {
            Ok(bitmap) => Some(Arc::new(bitmap)),
            Err(err) => {
                warn!(code, error = %err, "condition icon unavailable");
                None
            }
        }
    }

    fn fail(&self, query: &LocationQuery, err: QueryError) -> QueryError {
        warn!(%query, error = ?err, "query failed");
        self.view.send_modify(|v| {
            v.phase = Phase::Error;
            v.notice = Some(err.to_string());
        });
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ProviderError, RecommendationError},
        model::{AirQualitySnapshot, Coordinates, WeatherSnapshot},
    };
    use async_trait::async_trait;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::{io::Cursor, sync::Mutex as StdMutex};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Fail {
        None,
        NotFound,
        WeatherNetwork,
        AirNetwork,
        Icon,
    }

    #[derive(Debug)]
    struct FakeProvider {
        fail: Fail,
        air_coords: StdMutex<Vec<Coordinates>>,
    }

    impl FakeProvider {
        fn new(fail: Fail) -> Arc<Self> {
            Arc::new(Self { fail, air_coords: StdMutex::new(Vec::new()) })
        }
    }

    async fn transport_error() -> ProviderError {
        // Nothing listens on port 1.
        match reqwest::get("http://127.0.0.1:1/").await {
            Err(err) => ProviderError::Network(err),
            Ok(_) => ProviderError::Decode("unexpected listener on port 1".into()),
        }
    }

    fn delhi() -> WeatherSnapshot {
        WeatherSnapshot {
            name: "Delhi".into(),
            coord: Coordinates { lat: 28.6667, lon: 77.2167 },
            utc_offset_secs: 19800,
            temperature_c: 29.4,
            feels_like_c: 31.2,
            humidity_pct: 60,
            wind_speed_mps: 3.1,
            pressure_hpa: 1008,
            description: "clear sky".into(),
            icon_code: "01d".into(),
            // 2024-03-04 01:00Z and 12:45Z
            sunrise: 1_709_514_000,
            sunset: 1_709_556_300,
        }
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([255, 200, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).expect("png encodes");
        out.into_inner()
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch_weather(
            &self,
            city: &LocationQuery,
        ) -> Result<WeatherSnapshot, ProviderError> {
            match self.fail {
                Fail::NotFound => {
                    Err(ProviderError::NotFound { message: format!("{city} not found") })
                }
                Fail::WeatherNetwork => Err(transport_error().await),
                _ => Ok(WeatherSnapshot { name: city.to_string(), ..delhi() }),
            }
        }

        async fn fetch_air_quality(
            &self,
            coord: Coordinates,
        ) -> Result<AirQualitySnapshot, ProviderError> {
            self.air_coords.lock().expect("lock").push(coord);
            match self.fail {
                Fail::AirNetwork => Err(transport_error().await),
                _ => Ok(AirQualitySnapshot { aqi: 2 }),
            }
        }

        async fn fetch_condition_icon(&self, _code: &str) -> Result<Vec<u8>, ProviderError> {
            match self.fail {
                Fail::Icon => Err(ProviderError::Status { status: 404, body: String::new() }),
                _ => Ok(png(100, 100)),
            }
        }
    }

    #[derive(Debug)]
    struct FakeRecommender {
        reply: Option<String>,
        prompts: StdMutex<Vec<String>>,
    }

    impl FakeRecommender {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self { reply: Some(text.to_string()), prompts: StdMutex::new(Vec::new()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { reply: None, prompts: StdMutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Recommender for FakeRecommender {
        async fn complete(&self, prompt: &str) -> Result<String, RecommendationError> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            self.reply.clone().ok_or(RecommendationError::Empty)
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        // 2024-03-04T10:00:00Z, a Monday
        DateTime::<Utc>::from_timestamp(1_709_546_400, 0).expect("valid ts")
    }

    fn pipeline(
        provider: Arc<FakeProvider>,
        recommender: Arc<FakeRecommender>,
    ) -> (UpdatePipeline, watch::Receiver<ViewState>) {
        let (p, rx) = UpdatePipeline::new(provider, recommender, SunTimes::City);
        (p.with_clock(fixed_now), rx)
    }

    #[tokio::test]
    async fn delhi_end_to_end() {
        let recommender = FakeRecommender::replying("Stay hydrated and wear light cotton clothes.");
        let (pipeline, rx) = pipeline(FakeProvider::new(Fail::None), recommender.clone());

        let phase = pipeline.submit("Delhi").await.expect("query succeeds");
        assert_eq!(phase, Phase::Done);

        let view = rx.borrow().clone();
        assert_eq!(view.phase, Phase::Done);
        assert_eq!(view.city, "Delhi");
        assert_eq!(view.temperature, "29°");
        assert_eq!(view.feels_like, "Feels like 31°");
        assert_eq!(view.humidity, "60%");
        assert_eq!(view.wind_speed, "3.1 m/s");
        assert_eq!(view.pressure, "1008 hPa");
        assert_eq!(view.air_quality, "Fair");
        assert_eq!(view.description, "Clear sky");
        assert_eq!(view.local_time, "03:30 PM, Monday");
        assert_eq!(view.sunrise, "06:30 AM");
        assert_eq!(view.sunset, "06:15 PM");
        assert_eq!(view.recommendation, "Stay hydrated and wear light cotton clothes.");
        assert!(view.condition_icon.is_some());
        assert_eq!(view.revision, 1);
        assert!(view.notice.is_none());

        let prompts = recommender.prompts.lock().expect("lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Temperature: 29.4°C"));
        assert!(prompts[0].contains("Air Quality Index: 2"));
    }

    #[tokio::test]
    async fn air_quality_uses_fresh_coordinates() {
        let provider = FakeProvider::new(Fail::None);
        let (pipeline, _rx) = pipeline(provider.clone(), FakeRecommender::replying("ok"));

        pipeline.submit("Delhi").await.expect("query succeeds");

        let coords = provider.air_coords.lock().expect("lock");
        assert_eq!(coords.as_slice(), &[delhi().coord]);
    }

    #[tokio::test]
    async fn empty_query_stays_idle() {
        let (pipeline, rx) = pipeline(FakeProvider::new(Fail::None), FakeRecommender::replying("ok"));

        let err = pipeline.submit("   ").await.unwrap_err();

        assert!(matches!(err, QueryError::Validation));
        assert!(!err.clears_input());
        assert_eq!(pipeline.phase(), Phase::Idle);
        assert_eq!(rx.borrow().notice.as_deref(), Some("Please enter a city name"));
    }

    async fn populated(fail: Fail) -> (UpdatePipeline, watch::Receiver<ViewState>, ViewState) {
        // A second pipeline, backed by the failing provider, starts from a populated view.
        let (ok, _) = pipeline(FakeProvider::new(Fail::None), FakeRecommender::replying("ok"));
        ok.submit("Delhi").await.expect("query succeeds");
        let before = ok.view.borrow().clone();

        let (pipeline, rx) = pipeline(FakeProvider::new(fail), FakeRecommender::replying("ok"));
        pipeline.view.send_replace(before.clone());
        (pipeline, rx, before)
    }

    fn assert_fields_unchanged(before: &ViewState, after: &ViewState) {
        let mut expected = before.clone();
        expected.phase = after.phase;
        expected.notice = after.notice.clone();
        assert_eq!(&expected, after);
    }

    #[tokio::test]
    async fn not_found_leaves_view_untouched() {
        let (pipeline, rx, before) = populated(Fail::NotFound).await;

        let err = pipeline.submit("Atlantis").await.unwrap_err();

        assert!(matches!(err, QueryError::NotFound));
        assert!(err.clears_input());
        let after = rx.borrow().clone();
        assert_eq!(after.phase, Phase::Error);
        assert_eq!(after.notice.as_deref(), Some("City Not Found"));
        assert_fields_unchanged(&before, &after);
    }

    #[tokio::test]
    async fn weather_transport_failure_is_network_error() {
        let (pipeline, rx, before) = populated(Fail::WeatherNetwork).await;

        let err = pipeline.submit("Delhi").await.unwrap_err();

        assert!(matches!(err, QueryError::Network(_)));
        assert!(err.clears_input());
        assert_fields_unchanged(&before, &rx.borrow());
    }

    #[tokio::test]
    async fn air_quality_failure_never_populates() {
        let (pipeline, rx, before) = populated(Fail::AirNetwork).await;

        let err = pipeline.submit("Paris").await.unwrap_err();

        assert!(matches!(err, QueryError::Network(_)));
        let after = rx.borrow().clone();
        assert_eq!(after.phase, Phase::Error);
        assert_eq!(after.city, "Delhi");
        assert_fields_unchanged(&before, &after);
    }

    #[tokio::test]
    async fn icon_failure_is_not_fatal() {
        let recommender = FakeRecommender::replying("Enjoy the sun.");
        let (pipeline, rx) = pipeline(FakeProvider::new(Fail::Icon), recommender);

        let phase = pipeline.submit("Delhi").await.expect("query succeeds");

        assert_eq!(phase, Phase::Done);
        let view = rx.borrow().clone();
        assert!(view.condition_icon.is_none());
        assert_eq!(view.temperature, "29°");
        assert_eq!(view.recommendation, "Enjoy the sun.");
    }

    #[tokio::test]
    async fn recommendation_failure_falls_back() {
        let (pipeline, rx) = pipeline(FakeProvider::new(Fail::None), FakeRecommender::failing());

        let phase = pipeline.submit("Delhi").await.expect("query succeeds");

        assert_eq!(phase, Phase::Done);
        assert_eq!(rx.borrow().recommendation, FALLBACK_RECOMMENDATION);
    }

    #[tokio::test]
    async fn successful_query_replaces_previous_view() {
        let (pipeline, rx) = pipeline(FakeProvider::new(Fail::None), FakeRecommender::replying("ok"));

        pipeline.submit("Delhi").await.expect("first query");
        pipeline.submit("Mumbai").await.expect("second query");

        let view = rx.borrow().clone();
        assert_eq!(view.city, "Mumbai");
        assert_eq!(view.revision, 2);
    }

    #[tokio::test]
    async fn overlapping_submit_is_refused() {
        let (pipeline, _rx) = pipeline(FakeProvider::new(Fail::None), FakeRecommender::replying("ok"));

        let _held = pipeline.in_flight.try_lock().expect("free");
        let err = pipeline.submit("Delhi").await.unwrap_err();

        assert!(matches!(err, QueryError::Busy));
        assert_eq!(pipeline.phase(), Phase::Idle);
    }
}
