//! Pointer interaction state machine
//!
//! One current [`InteractionState`] plus a pure [`transition`] function:
//! `(state, context, event) -> (state, effects)`. Effects describe what the
//! caller must do (pan, zoom, update the preview, calibrate, create a
//! measurement); the machine itself never touches the document.

use crate::geometry::{self, PlanPoint, ScreenPoint};
use crate::measurement::MeasurementKind;

/// Active drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// No tool: dragging pans the plan
    #[default]
    None,
    Line,
    Rectangle,
    Polygon,
    Count,
}

/// Pointer position in both coordinate spaces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub screen: ScreenPoint,
    pub plan: PlanPoint,
}

/// Input delivered to the machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    PointerDown(PointerInput),
    PointerMove(PointerInput),
    PointerUp(PointerInput),
    DoubleClick(PointerInput),
    Wheel { delta: f64 },
    /// Abandon the shape in progress (Escape)
    Cancel,
}

/// Current interaction
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Panning {
        last: ScreenPoint,
    },
    CalibratingFirstPoint,
    CalibratingSecondPoint {
        first: PlanPoint,
    },
    DrawingLinear {
        anchor: PlanPoint,
        current: PlanPoint,
    },
    DrawingRectangle {
        anchor: PlanPoint,
        current: PlanPoint,
    },
    DrawingPolygon {
        vertices: Vec<PlanPoint>,
        cursor: PlanPoint,
    },
    PlacingCount,
}

impl InteractionState {
    /// Resting state for a tool
    pub fn ready(tool: Tool) -> Self {
        match tool {
            Tool::Count => InteractionState::PlacingCount,
            _ => InteractionState::Idle,
        }
    }

    /// Resting state under a context; nothing is armed while the page loads
    pub fn resting(ctx: &TransitionContext) -> Self {
        if ctx.drawing_enabled {
            Self::ready(ctx.tool)
        } else {
            InteractionState::Idle
        }
    }

    /// Whether a shape is mid-draw
    pub fn is_drawing(&self) -> bool {
        matches!(
            self,
            InteractionState::DrawingLinear { .. }
                | InteractionState::DrawingRectangle { .. }
                | InteractionState::DrawingPolygon { .. }
        )
    }

    /// Whether calibration point picking is active
    pub fn is_calibrating(&self) -> bool {
        matches!(
            self,
            InteractionState::CalibratingFirstPoint | InteractionState::CalibratingSecondPoint { .. }
        )
    }
}

/// Live, not-yet-committed shape shown while drawing
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewShape {
    Line { a: PlanPoint, b: PlanPoint },
    Rectangle { a: PlanPoint, b: PlanPoint },
    /// Open outline plus the closing edge to the cursor
    Polygon { vertices: Vec<PlanPoint>, cursor: PlanPoint },
    CalibrationLine { a: PlanPoint, b: PlanPoint },
}

/// Completed geometry ready to be measured
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDraft {
    pub kind: MeasurementKind,
    pub points: Vec<PlanPoint>,
}

/// Why an input produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The page raster is not loaded
    PageNotReady,
    /// Finalizing needs a calibration on this page
    Uncalibrated,
    /// Polygon closed with fewer than three distinct vertices
    TooFewVertices,
    /// Zero-length line, zero-width rectangle or zero-area polygon
    Degenerate,
    /// Polygon edges cross and crossing outlines are rejected
    SelfIntersecting,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PanBy { dx: f64, dy: f64 },
    ZoomBy { delta: f64 },
    SetPreview(Option<PreviewShape>),
    Calibrate { a: PlanPoint, b: PlanPoint },
    Finalize(ShapeDraft),
    Blocked(BlockReason),
}

/// Everything a transition may depend on besides the state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionContext {
    pub tool: Tool,
    /// The current page has a calibration
    pub calibrated: bool,
    /// The page raster is ready
    pub drawing_enabled: bool,
    /// Plan distance within which a click on the first vertex closes a polygon
    pub close_tolerance: f64,
    /// Plan distance under which consecutive vertices are merged
    pub merge_tolerance: f64,
    pub reject_self_intersecting: bool,
}

impl Default for TransitionContext {
    fn default() -> Self {
        Self {
            tool: Tool::None,
            calibrated: false,
            drawing_enabled: true,
            close_tolerance: 8.0,
            merge_tolerance: 0.5,
            reject_self_intersecting: false,
        }
    }
}

/// Next state and the effects to run
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: InteractionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: InteractionState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(state: InteractionState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }
}

/// Pure transition function
pub fn transition(
    state: &InteractionState,
    ctx: &TransitionContext,
    event: &InteractionEvent,
) -> Transition {
    match event {
        InteractionEvent::Wheel { delta } => {
            Transition::with(state.clone(), vec![Effect::ZoomBy { delta: *delta }])
        }
        InteractionEvent::Cancel => {
            let effects = if state.is_drawing() || state.is_calibrating() {
                vec![Effect::SetPreview(None)]
            } else {
                Vec::new()
            };
            Transition::with(InteractionState::resting(ctx), effects)
        }
        InteractionEvent::PointerDown(input) => pointer_down(state, ctx, input),
        InteractionEvent::PointerMove(input) => pointer_move(state, input),
        InteractionEvent::PointerUp(input) => pointer_up(state, ctx, input),
        InteractionEvent::DoubleClick(_) => match state {
            InteractionState::DrawingPolygon { vertices, cursor } => {
                close_polygon(vertices, *cursor, ctx)
            }
            _ => Transition::to(state.clone()),
        },
    }
}

fn pointer_down(
    state: &InteractionState,
    ctx: &TransitionContext,
    input: &PointerInput,
) -> Transition {
    if !ctx.drawing_enabled {
        let state = match state {
            InteractionState::PlacingCount => InteractionState::Idle,
            other => other.clone(),
        };
        return Transition::with(state, vec![Effect::Blocked(BlockReason::PageNotReady)]);
    }

    let p = input.plan;
    match state {
        InteractionState::CalibratingFirstPoint => Transition::with(
            InteractionState::CalibratingSecondPoint { first: p },
            vec![Effect::SetPreview(Some(PreviewShape::CalibrationLine {
                a: p,
                b: p,
            }))],
        ),
        InteractionState::CalibratingSecondPoint { first } => Transition::with(
            InteractionState::Idle,
            vec![
                Effect::SetPreview(None),
                Effect::Calibrate { a: *first, b: p },
            ],
        ),
        InteractionState::Idle | InteractionState::PlacingCount => match ctx.tool {
            Tool::None => Transition::to(InteractionState::Panning { last: input.screen }),
            Tool::Line => Transition::with(
                InteractionState::DrawingLinear {
                    anchor: p,
                    current: p,
                },
                vec![Effect::SetPreview(Some(PreviewShape::Line { a: p, b: p }))],
            ),
            Tool::Rectangle => Transition::with(
                InteractionState::DrawingRectangle {
                    anchor: p,
                    current: p,
                },
                vec![Effect::SetPreview(Some(PreviewShape::Rectangle {
                    a: p,
                    b: p,
                }))],
            ),
            Tool::Polygon => Transition::with(
                InteractionState::DrawingPolygon {
                    vertices: vec![p],
                    cursor: p,
                },
                vec![Effect::SetPreview(Some(PreviewShape::Polygon {
                    vertices: vec![p],
                    cursor: p,
                }))],
            ),
            Tool::Count => Transition::with(
                InteractionState::PlacingCount,
                vec![Effect::Finalize(ShapeDraft {
                    kind: MeasurementKind::Count,
                    points: vec![p],
                })],
            ),
        },
        InteractionState::DrawingPolygon { vertices, cursor } => {
            let closes = vertices.len() >= 3
                && vertices
                    .first()
                    .is_some_and(|first| first.distance_to(&p) <= ctx.close_tolerance);
            if closes {
                return close_polygon(vertices, *cursor, ctx);
            }
            let mut vertices = vertices.clone();
            vertices.push(p);
            Transition::with(
                InteractionState::DrawingPolygon {
                    vertices: vertices.clone(),
                    cursor: p,
                },
                vec![Effect::SetPreview(Some(PreviewShape::Polygon {
                    vertices,
                    cursor: p,
                }))],
            )
        }
        // A second button pressed mid-drag changes nothing
        InteractionState::Panning { .. }
        | InteractionState::DrawingLinear { .. }
        | InteractionState::DrawingRectangle { .. } => Transition::to(state.clone()),
    }
}

fn pointer_move(state: &InteractionState, input: &PointerInput) -> Transition {
    let p = input.plan;
    match state {
        InteractionState::Panning { last } => Transition::with(
            InteractionState::Panning { last: input.screen },
            vec![Effect::PanBy {
                dx: input.screen.x - last.x,
                dy: input.screen.y - last.y,
            }],
        ),
        InteractionState::DrawingLinear { anchor, .. } => Transition::with(
            InteractionState::DrawingLinear {
                anchor: *anchor,
                current: p,
            },
            vec![Effect::SetPreview(Some(PreviewShape::Line { a: *anchor, b: p }))],
        ),
        InteractionState::DrawingRectangle { anchor, .. } => Transition::with(
            InteractionState::DrawingRectangle {
                anchor: *anchor,
                current: p,
            },
            vec![Effect::SetPreview(Some(PreviewShape::Rectangle {
                a: *anchor,
                b: p,
            }))],
        ),
        InteractionState::DrawingPolygon { vertices, .. } => Transition::with(
            InteractionState::DrawingPolygon {
                vertices: vertices.clone(),
                cursor: p,
            },
            vec![Effect::SetPreview(Some(PreviewShape::Polygon {
                vertices: vertices.clone(),
                cursor: p,
            }))],
        ),
        InteractionState::CalibratingSecondPoint { first } => Transition::with(
            state.clone(),
            vec![Effect::SetPreview(Some(PreviewShape::CalibrationLine {
                a: *first,
                b: p,
            }))],
        ),
        _ => Transition::to(state.clone()),
    }
}

fn pointer_up(state: &InteractionState, ctx: &TransitionContext, input: &PointerInput) -> Transition {
    let ready = InteractionState::resting(ctx);
    match state {
        InteractionState::Panning { .. } => Transition::to(ready),
        InteractionState::DrawingLinear { anchor, .. } => {
            let degenerate = anchor.distance_to(&input.plan) <= f64::EPSILON;
            finish_two_point(ready, MeasurementKind::Linear, *anchor, input.plan, degenerate, ctx)
        }
        InteractionState::DrawingRectangle { anchor, .. } => {
            let degenerate = (anchor.x - input.plan.x).abs() <= f64::EPSILON
                || (anchor.y - input.plan.y).abs() <= f64::EPSILON;
            finish_two_point(
                ready,
                MeasurementKind::Rectangle,
                *anchor,
                input.plan,
                degenerate,
                ctx,
            )
        }
        _ => Transition::to(state.clone()),
    }
}

fn finish_two_point(
    ready: InteractionState,
    kind: MeasurementKind,
    anchor: PlanPoint,
    end: PlanPoint,
    degenerate: bool,
    ctx: &TransitionContext,
) -> Transition {
    let outcome = if degenerate {
        Effect::Blocked(BlockReason::Degenerate)
    } else if !ctx.calibrated {
        Effect::Blocked(BlockReason::Uncalibrated)
    } else {
        Effect::Finalize(ShapeDraft {
            kind,
            points: vec![anchor, end],
        })
    };
    Transition::with(ready, vec![Effect::SetPreview(None), outcome])
}

fn close_polygon(vertices: &[PlanPoint], cursor: PlanPoint, ctx: &TransitionContext) -> Transition {
    let keep = || InteractionState::DrawingPolygon {
        vertices: vertices.to_vec(),
        cursor,
    };

    let ring = geometry::dedup_vertices(vertices, ctx.merge_tolerance);
    if ring.len() < 3 {
        return Transition::with(keep(), vec![Effect::Blocked(BlockReason::TooFewVertices)]);
    }
    if !ctx.calibrated {
        return Transition::with(keep(), vec![Effect::Blocked(BlockReason::Uncalibrated)]);
    }

    let ready = InteractionState::resting(ctx);
    if ctx.reject_self_intersecting && geometry::is_self_intersecting(&ring) {
        return Transition::with(
            ready,
            vec![
                Effect::SetPreview(None),
                Effect::Blocked(BlockReason::SelfIntersecting),
            ],
        );
    }
    if geometry::polygon_area(&ring) <= f64::EPSILON {
        return Transition::with(
            ready,
            vec![
                Effect::SetPreview(None),
                Effect::Blocked(BlockReason::Degenerate),
            ],
        );
    }

    Transition::with(
        ready,
        vec![
            Effect::SetPreview(None),
            Effect::Finalize(ShapeDraft {
                kind: MeasurementKind::Polygon,
                points: ring,
            }),
        ],
    )
}

/// Current state plus tool selection
#[derive(Debug, Clone, Default)]
pub struct InteractionMachine {
    state: InteractionState,
    tool: Tool,
    /// The page raster is pending or failed
    loading: bool,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Select a tool; any shape in progress (or calibration pick) is abandoned
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Effect> {
        let abandoned = self.state.is_drawing() || self.state.is_calibrating();
        self.tool = tool;
        self.state = self.resting();
        if abandoned {
            vec![Effect::SetPreview(None)]
        } else {
            Vec::new()
        }
    }

    /// Follow the page loader; the machine rests in `Idle` while drawing is disabled
    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.loading = !enabled;
        if matches!(
            self.state,
            InteractionState::Idle | InteractionState::PlacingCount
        ) {
            self.state = self.resting();
        }
    }

    fn resting(&self) -> InteractionState {
        if self.loading {
            InteractionState::Idle
        } else {
            InteractionState::ready(self.tool)
        }
    }

    /// Enter calibration mode; deselects the drawing tool
    pub fn begin_calibration(&mut self) -> Vec<Effect> {
        let effects = self.set_tool(Tool::None);
        self.state = InteractionState::CalibratingFirstPoint;
        effects
    }

    /// Return to the resting state of the current tool
    pub fn reset(&mut self) -> Vec<Effect> {
        self.set_tool(self.tool)
    }

    /// Feed one event through [`transition`]
    ///
    /// The context's `tool` is taken from the machine.
    pub fn handle(&mut self, ctx: TransitionContext, event: &InteractionEvent) -> Vec<Effect> {
        let ctx = TransitionContext {
            tool: self.tool,
            ..ctx
        };
        let Transition { state, effects } = transition(&self.state, &ctx, event);
        self.state = state;
        effects
    }
}
