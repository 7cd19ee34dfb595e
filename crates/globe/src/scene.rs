use foundation::math::{Orthographic, Vec2};
use formats::{CountryShape, Ring};
use runtime::Rotation;

use crate::countries::{VisitedSet, resolve_country};
use crate::speckle::{Speckle, generate_speckles, sampling_bounds};

/// Output surface size in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Gap between the globe's limb and the nearest edge.
    pub padding: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 480.0,
            height: 480.0,
            padding: 8.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn projection(&self, rotation: &Rotation) -> Orthographic {
        let radius = (self.width.min(self.height) / 2.0 - self.padding).max(1.0);
        Orthographic::new(Vec2::new(self.width / 2.0, self.height / 2.0), radius)
            .with_rotation(rotation.lon_deg(), rotation.tilt_deg())
    }
}

/// A dataset shape with its resolved name, highlight flag and decoration.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneShape {
    pub shape: CountryShape,
    pub canonical: String,
    pub visited: bool,
    /// Empty unless `visited`.
    pub speckles: Vec<Speckle>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenSpeckle {
    pub point: Vec2,
    pub radius: f64,
    pub opacity: f64,
}

/// One shape as seen in a particular frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedShape {
    /// Index into [`GlobeScene::shapes`].
    pub index: usize,
    pub name: String,
    pub visited: bool,
    /// Closed screen-space rings of every front-facing polygon.
    pub rings: Vec<Vec<Vec2>>,
    /// Front-facing speckles; only meaningful inside `rings`.
    pub speckles: Vec<ScreenSpeckle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedFrame {
    pub viewport: Viewport,
    pub center: Vec2,
    pub radius: f64,
    pub shapes: Vec<ProjectedShape>,
}

/// The world dataset plus the current visited set.
#[derive(Debug, Clone, Default)]
pub struct GlobeScene {
    shapes: Vec<SceneShape>,
    visited: VisitedSet,
}

impl GlobeScene {
    pub fn new(shapes: Vec<CountryShape>) -> Self {
        let shapes = shapes
            .into_iter()
            .map(|shape| SceneShape {
                canonical: resolve_country(&shape.name),
                shape,
                visited: false,
                speckles: Vec::new(),
            })
            .collect();
        Self {
            shapes,
            visited: VisitedSet::default(),
        }
    }

    pub fn with_visited<I, S>(shapes: Vec<CountryShape>, visited: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scene = Self::new(shapes);
        scene.set_visited(visited);
        scene
    }

    /// Replaces the visited set, regenerating decoration only for shapes
    /// whose highlight changed.
    pub fn set_visited<I, S>(&mut self, visited: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.visited = VisitedSet::from_names(visited);
        for s in &mut self.shapes {
            let visited = self.visited.contains_canonical(&s.canonical);
            if visited == s.visited {
                continue;
            }
            s.visited = visited;
            s.speckles = if visited {
                generate_speckles(&s.canonical, &sampling_bounds(&s.shape))
            } else {
                Vec::new()
            };
        }
    }

    pub fn shapes(&self) -> &[SceneShape] {
        &self.shapes
    }

    pub fn visited_shapes(&self) -> impl Iterator<Item = &SceneShape> {
        self.shapes.iter().filter(|s| s.visited)
    }

    pub fn visited_set(&self) -> &VisitedSet {
        &self.visited
    }

    /// Projects every front-facing shape for one orientation.
    pub fn project(&self, rotation: &Rotation, viewport: Viewport) -> ProjectedFrame {
        let proj = viewport.projection(rotation);
        let mut shapes = Vec::new();

        for (index, s) in self.shapes.iter().enumerate() {
            let rings: Vec<Vec<Vec2>> = s
                .shape
                .polygons
                .iter()
                .filter(|poly| poly.first().is_some_and(|outer| faces_viewer(&proj, outer)))
                .flat_map(|poly| poly.iter())
                .filter_map(|ring| project_ring(&proj, ring))
                .collect();
            if rings.is_empty() {
                continue;
            }

            let speckles = s
                .speckles
                .iter()
                .filter_map(|sp| {
                    let p = proj.project(sp.lon_deg, sp.lat_deg);
                    p.visible.then_some(ScreenSpeckle {
                        point: p.point,
                        radius: sp.radius,
                        opacity: sp.opacity,
                    })
                })
                .collect();

            shapes.push(ProjectedShape {
                index,
                name: s.shape.name.clone(),
                visited: s.visited,
                rings,
                speckles,
            });
        }

        ProjectedFrame {
            viewport,
            center: proj.center,
            radius: proj.radius,
            shapes,
        }
    }
}

fn faces_viewer(proj: &Orthographic, ring: &Ring) -> bool {
    ring.iter()
        .any(|p| proj.project(p.lon_deg, p.lat_deg).visible)
}

fn project_ring(proj: &Orthographic, ring: &Ring) -> Option<Vec<Vec2>> {
    if ring.len() < 3 {
        return None;
    }
    let mut any_visible = false;
    let points = ring
        .iter()
        .map(|p| {
            let projected = proj.project_clamped(p.lon_deg, p.lat_deg);
            any_visible |= projected.visible;
            projected.point
        })
        .collect();
    any_visible.then_some(points)
}

#[cfg(test)]
mod tests {
    use formats::{CountryShape, GeoPoint};
    use runtime::{Frame, Rotation};

    use super::{GlobeScene, ProjectedFrame, Viewport};

    fn boxed(name: &str, lon: f64, lat: f64) -> CountryShape {
        let ring = vec![
            GeoPoint::new(lon, lat),
            GeoPoint::new(lon + 4.0, lat),
            GeoPoint::new(lon + 4.0, lat + 4.0),
            GeoPoint::new(lon, lat + 4.0),
            GeoPoint::new(lon, lat),
        ];
        CountryShape::new(None, name, vec![vec![ring]])
    }

    fn dataset() -> Vec<CountryShape> {
        vec![
            boxed("United States of America", -100.0, 35.0),
            boxed("France", 0.0, 45.0),
            boxed("Czech Republic", 14.0, 49.0),
            boxed("Germany", 8.0, 50.0),
        ]
    }

    fn visited_names(scene: &GlobeScene) -> Vec<&str> {
        scene
            .visited_shapes()
            .map(|s| s.shape.name.as_str())
            .collect()
    }

    #[test]
    fn marks_exactly_the_visited_shapes() {
        let scene = GlobeScene::with_visited(dataset(), ["USA", "france", "Czechia"]);
        assert_eq!(
            visited_names(&scene),
            vec!["United States of America", "France", "Czech Republic"]
        );
        let germany = &scene.shapes()[3];
        assert!(!germany.visited);
        assert!(germany.speckles.is_empty());
    }

    #[test]
    fn empty_visited_list_highlights_nothing_but_still_projects() {
        let scene = GlobeScene::with_visited(dataset(), Vec::<String>::new());
        assert_eq!(scene.visited_shapes().count(), 0);

        let rotation = Rotation::new(0.2, 0.0);
        let a = scene.project(&rotation.at_frame(Frame::new(0, 1.0 / 60.0)), Viewport::default());
        let b = scene.project(&rotation.at_frame(Frame::new(50, 1.0 / 60.0)), Viewport::default());
        assert!(!a.shapes.is_empty());
        assert!(a.shapes.iter().all(|s| !s.visited && s.speckles.is_empty()));
        let france = |f: &ProjectedFrame| {
            f.shapes
                .iter()
                .find(|s| s.name == "France")
                .map(|s| s.rings.clone())
        };
        assert!(france(&a).is_some());
        assert_ne!(france(&a), france(&b));
    }

    #[test]
    fn re_setting_visited_keeps_decoration_stable() {
        let mut scene = GlobeScene::with_visited(dataset(), ["France"]);
        let before = scene.shapes()[1].speckles.clone();
        scene.set_visited(["France", "Germany"]);
        assert_eq!(scene.shapes()[1].speckles, before);
        assert!(scene.shapes()[3].visited);

        let fresh = GlobeScene::with_visited(dataset(), ["france"]);
        assert_eq!(fresh.shapes()[1].speckles, before);
    }

    #[test]
    fn far_side_shapes_are_culled() {
        let scene = GlobeScene::with_visited(dataset(), ["France"]);
        // Longitude 180 faces the viewer, so Europe (around 0..18E) is behind.
        let rotation = Rotation::new(180.0, 0.0).at_frame(Frame::new(1, 1.0));
        let frame = scene.project(&rotation, Viewport::default());
        let names: Vec<&str> = frame.shapes.iter().map(|s| s.name.as_str()).collect();
        assert!(!names.contains(&"France"));
        assert!(!names.contains(&"Germany"));
    }

    #[test]
    fn visible_speckles_project_inside_the_disc() {
        let scene = GlobeScene::with_visited(dataset(), ["France"]);
        let frame = scene.project(&Rotation::new(0.0, 0.0), Viewport::default());
        let france = frame
            .shapes
            .iter()
            .find(|s| s.name == "France")
            .expect("france is front-facing");
        assert!(!france.speckles.is_empty());
        for sp in &france.speckles {
            assert!((sp.point - frame.center).length() <= frame.radius + 1e-9);
        }
    }
}
