//! Keyboard and pointer input types.

/// Describe a keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    /// Platform key code.
    ///
    /// This is the X11 hardware keycode on X11 and the Virtual-Key code on Windows.
    pub code: u32,

    /// Modifier keys held while this key changed state.
    pub modifiers: Modifiers,

    /// The state of the key input.
    pub state: KeyInputState,
}

/// Describe the state of a key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInputState {
    /// The key is pressed down.
    Pressed,

    /// The key is released.
    Released,
}

/// Describe a pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button
    Left,

    /// Right button
    Right,

    /// Wheel button
    Middle,

    /// Extra button 1 (usually mapped to `Back` action)
    Back,

    /// Extra button 2 (usually mapped to `Forward` action)
    Forward,

    /// Any other platform button number, including X11 wheel buttons.
    Other(u8),
}

/// Describe the state of a pointer button input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// Button is pressed down.
    Pressed,

    /// Button is released.
    Released,
}

bitflags::bitflags! {
    /// Modifier keys state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

/// Key combination reserved by the injection mechanism.
///
/// A key event matches when its code is equal and every modifier of the hotkey is held.
/// Extra modifiers do not prevent a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    /// Platform key code, see [`KeyInput::code`].
    pub code: u32,

    /// Modifiers which must be held.
    pub modifiers: Modifiers,
}

impl Hotkey {
    pub const fn new(code: u32, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Check if `input` is this hotkey, pressed or released.
    #[inline]
    pub const fn matches(&self, input: &KeyInput) -> bool {
        input.code == self.code && input.modifiers.contains(self.modifiers)
    }
}
